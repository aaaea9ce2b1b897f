//! Cache Module
//!
//! Dataset caching: the cached table, the per-key load locks and usage
//! statistics.

pub mod dataset;
pub mod inner;
pub mod locks;
pub mod stats;


pub use dataset::{current_timestamp_ms, CachedDataset};
pub use inner::{Aggregator, InnerCache};
pub use locks::LockRegistry;
pub use stats::CacheStats;
