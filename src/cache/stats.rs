//! Cache Statistics Module
//!
//! Tracks load and query activity for a cached dataset.

use serde::Serialize;

// == Cache Stats ==
/// Statistics about dataset cache usage
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of times a dataset was loaded into the cache
    pub loads: u64,
    /// Number of queries answered from the cached dataset
    pub queries: u64,
    /// Data rows held by the current dataset
    pub cached_rows: usize,
    /// Millisecond timestamp of the most recent load, if any
    pub last_loaded_at_ms: Option<u64>,
}

impl CacheStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a dataset load.
    pub fn record_load(&mut self, row_count: usize, loaded_at_ms: u64) {
        self.loads += 1;
        self.cached_rows = row_count;
        self.last_loaded_at_ms = Some(loaded_at_ms);
    }

    /// Records a query answered from the cache.
    pub fn record_query(&mut self) {
        self.queries += 1;
    }
}
