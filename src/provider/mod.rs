//! Provider Module
//!
//! The orchestration layer: the retrieval boundary traits and the data
//! provider built on top of the cache.

pub mod core;
pub mod source;

pub use self::core::{DataProvider, NOT_SUPPORTED};
pub use self::source::{RawDataSource, SelfAggregating};
