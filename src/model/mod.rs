//! Data Models Module
//!
//! Request and result shapes exchanged with providers.

pub mod request;
pub mod result;

pub use request::{AggregateRequest, DimensionSpec, MeasureSpec};
pub use result::AggregateResult;
