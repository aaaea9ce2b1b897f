//! Inner Cache Module
//!
//! Holds the cached dataset for one provider and answers queries over it.
//! The state machine per instance is Empty, then Fresh after a load, then
//! Stale once the deadline passes; a reload moves Stale back to Fresh. A
//! failed load leaves the state untouched.
//!
//! Concurrency exclusion is the caller's job: the provider serializes
//! loads through the per-key lock registry and wraps the cache in an
//! `RwLock` for instance-level access.

use crate::cache::dataset::{current_timestamp_ms, CachedDataset};
use crate::cache::stats::CacheStats;
use crate::error::{ProviderError, Result};
use crate::model::{AggregateRequest, AggregateResult, DimensionSpec};
use std::collections::BTreeSet;
use std::sync::Arc;

// == Aggregator Boundary ==
/// Aggregation collaborator computing an aggregated view over cached rows.
///
/// Implementations interpret the request's measures; the cache itself never
/// does aggregation math. Synchronous: the rows are already in memory.
pub trait Aggregator: Send + Sync {
    /// Computes the aggregated view of `dataset` described by `request`.
    fn aggregate(
        &self,
        dataset: &CachedDataset,
        request: &AggregateRequest,
    ) -> Result<AggregateResult>;
}

// == Inner Cache ==
/// Per-provider dataset cache.
pub struct InnerCache {
    /// The cached dataset, absent until the first successful load
    dataset: Option<CachedDataset>,
    /// Collaborator answering aggregate queries
    aggregator: Arc<dyn Aggregator>,
    /// Load and query accounting
    stats: CacheStats,
}

impl InnerCache {
    /// Creates an empty cache with the given aggregation collaborator.
    pub fn new(aggregator: Arc<dyn Aggregator>) -> Self {
        Self {
            dataset: None,
            aggregator,
            stats: CacheStats::new(),
        }
    }

    // == State ==
    /// Checks if a dataset has ever been loaded, fresh or not.
    pub fn exists(&self) -> bool {
        self.dataset.is_some()
    }

    /// Checks if the cache needs a load now: never loaded, or expired.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(current_timestamp_ms())
    }

    /// Checks if the cache needs a load at the given instant.
    pub fn is_stale_at(&self, now_ms: u64) -> bool {
        match &self.dataset {
            Some(dataset) => dataset.is_stale_at(now_ms),
            None => true,
        }
    }

    /// Data rows held by the current dataset, 0 when empty.
    pub fn row_count(&self) -> usize {
        self.dataset
            .as_ref()
            .map(|dataset| dataset.row_count())
            .unwrap_or(0)
    }

    /// Snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // == Load ==
    /// Replaces the cached dataset wholesale with freshly fetched rows.
    ///
    /// # Arguments
    /// * `rows` - Header row plus data rows
    /// * `ttl_seconds` - Freshness window for the new dataset
    ///
    /// # Returns
    /// The number of data rows loaded. A table without a valid header is
    /// rejected and the previous dataset, if any, stays in place.
    pub fn load(&mut self, rows: Vec<Vec<String>>, ttl_seconds: u64) -> Result<usize> {
        let dataset = CachedDataset::new(rows, ttl_seconds)?;
        let row_count = dataset.row_count();
        self.stats.record_load(row_count, dataset.loaded_at());
        self.dataset = Some(dataset);
        Ok(row_count)
    }

    // == Queries ==
    /// The header of the cached dataset.
    pub fn query_columns(&mut self) -> Result<Vec<String>> {
        let dataset = self.dataset.as_ref().ok_or(ProviderError::NotLoaded)?;
        let columns = dataset.header().to_vec();
        self.stats.record_query();
        Ok(columns)
    }

    /// Aggregated view of the cached dataset, computed by the collaborator.
    pub fn query_aggregate(&mut self, request: &AggregateRequest) -> Result<AggregateResult> {
        let dataset = self.dataset.as_ref().ok_or(ProviderError::NotLoaded)?;
        let result = self.aggregator.aggregate(dataset, request)?;
        self.stats.record_query();
        Ok(result)
    }

    /// Distinct values of one column, one single-cell row per value, sorted
    /// ascending. Rows are pre-filtered by the request's filter specs: a row
    /// passes a filter when its cell equals any of the filter's values.
    /// Filters naming unknown columns or carrying no values do not restrict.
    pub fn query_dimension_values(
        &mut self,
        column: &str,
        request: &AggregateRequest,
    ) -> Result<Vec<Vec<String>>> {
        let dataset = self.dataset.as_ref().ok_or(ProviderError::NotLoaded)?;
        let target = dataset.column_index(column)?;

        let active_filters: Vec<(usize, &DimensionSpec)> = request
            .filters
            .iter()
            .filter(|spec| !spec.values.is_empty())
            .filter_map(|spec| {
                dataset
                    .column_index(&spec.name)
                    .ok()
                    .map(|index| (index, spec))
            })
            .collect();

        let mut distinct = BTreeSet::new();
        for row in dataset.data_rows() {
            let passes = active_filters.iter().all(|(index, spec)| {
                row.get(*index)
                    .map(|cell| spec.values.contains(cell))
                    .unwrap_or(false)
            });
            if !passes {
                continue;
            }
            if let Some(cell) = row.get(target) {
                distinct.insert(cell.clone());
            }
        }
        self.stats.record_query();
        Ok(distinct.into_iter().map(|value| vec![value]).collect())
    }
}
