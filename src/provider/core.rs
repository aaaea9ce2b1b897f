//! Data Provider Module
//!
//! The orchestrator. A provider evaluates embedded expressions in the
//! request, routes self-aggregating sources straight to their backend,
//! and otherwise serves aggregated views from the cached dataset,
//! loading it at most once per key at a time.

use crate::cache::{Aggregator, CacheStats, InnerCache, LockRegistry};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::expr::Evaluator;
use crate::key::{
    derive_cache_key, CacheKey, DataSourceDescriptor, QueryDescriptor, AGGREGATE_PROVIDER_KEY,
};
use crate::model::{AggregateRequest, AggregateResult};
use crate::provider::source::{RawDataSource, SelfAggregating};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Sentinel returned by `get_view_query_text` when the source has no
/// backend query to show.
pub const NOT_SUPPORTED: &str = "Not Support";

// == Data Provider ==
/// Cached, aggregated access to one logical dataset.
///
/// A provider owns the descriptor pair naming the dataset, the raw
/// source that can fetch it and the cache the fetched rows live in.
/// Loads for the same descriptor pair are serialized through the lock
/// registry, which is process-wide by default, so two provider instances
/// built from equal descriptors still never load concurrently. Loads for
/// different pairs run in parallel.
pub struct DataProvider {
    /// Descriptor of the backing data source
    data_source: DataSourceDescriptor,
    /// Descriptor of the query against that source
    query: QueryDescriptor,
    /// Retrieval boundary
    source: Arc<dyn RawDataSource>,
    /// Cached dataset plus query facilities
    cache: RwLock<InnerCache>,
    /// Expression evaluator applied to request dimension values
    evaluator: Arc<Evaluator>,
    /// Per-key load locks
    locks: Arc<LockRegistry>,
    /// Refresh interval and result limit
    config: ProviderConfig,
}

impl DataProvider {
    /// Creates a provider with the default configuration, the builtin
    /// expression whitelist and the process-wide lock registry.
    ///
    /// # Arguments
    /// * `data_source` - Descriptor of the backing data source
    /// * `query` - Descriptor of the query against that source
    /// * `source` - Retrieval boundary implementation
    /// * `aggregator` - Collaborator computing aggregated views over cached rows
    pub fn new(
        data_source: DataSourceDescriptor,
        query: QueryDescriptor,
        source: Arc<dyn RawDataSource>,
        aggregator: Arc<dyn Aggregator>,
    ) -> Self {
        Self {
            data_source,
            query,
            source,
            cache: RwLock::new(InnerCache::new(aggregator)),
            evaluator: Arc::new(Evaluator::with_builtins()),
            locks: LockRegistry::global(),
            config: ProviderConfig::default(),
        }
    }

    // == Builders ==
    /// Overrides the configuration.
    pub fn with_config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the expression evaluator, e.g. to extend the whitelist.
    pub fn with_evaluator(mut self, evaluator: Arc<Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Overrides the lock registry. Providers sharing a registry derive
    /// mutual exclusion from the cache key alone.
    pub fn with_lock_registry(mut self, locks: Arc<LockRegistry>) -> Self {
        self.locks = locks;
        self
    }

    // == Accessors ==
    /// The cache key derived from this provider's descriptor pair.
    pub fn cache_key(&self) -> CacheKey {
        derive_cache_key(&self.data_source, &self.query)
    }

    /// Advisory row cap for aggregation collaborators.
    pub fn result_limit(&self) -> usize {
        self.config.result_limit
    }

    /// Snapshot of the cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    // == Public Operations ==
    /// Aggregated view of the dataset.
    ///
    /// Embedded expressions in the request are evaluated first. A
    /// self-aggregating source answers directly from its backend;
    /// otherwise the dataset is loaded if needed and the aggregation
    /// collaborator runs over the cached rows.
    ///
    /// # Arguments
    /// * `request` - Dimensions and measures of the view
    /// * `force_reload` - Reload the dataset even when fresh
    pub async fn get_aggregate_data(
        &self,
        request: AggregateRequest,
        force_reload: bool,
    ) -> Result<AggregateResult> {
        let request = self.resolve_expressions(request)?;
        if let Some(backend) = self.self_aggregating() {
            debug!("Delegating aggregate query to self-aggregating source");
            return backend
                .query_aggregate(&self.data_source, &self.query, &request)
                .await;
        }
        self.check_and_load(force_reload).await?;
        self.cache.write().await.query_aggregate(&request)
    }

    /// Distinct values of one column, filtered by the request's filter
    /// dimensions.
    ///
    /// # Arguments
    /// * `column` - Column to enumerate
    /// * `request` - Carries the filter dimensions; embedded expressions
    ///   are evaluated first
    /// * `force_reload` - Reload the dataset even when fresh
    pub async fn get_dimension_values(
        &self,
        column: &str,
        request: AggregateRequest,
        force_reload: bool,
    ) -> Result<Vec<Vec<String>>> {
        let request = self.resolve_expressions(request)?;
        if let Some(backend) = self.self_aggregating() {
            debug!("Delegating dimension query to self-aggregating source");
            return backend
                .query_dimension_values(&self.data_source, &self.query, column, &request)
                .await;
        }
        self.check_and_load(force_reload).await?;
        self.cache
            .write()
            .await
            .query_dimension_values(column, &request)
    }

    /// Column names of the dataset.
    pub async fn get_columns(&self, force_reload: bool) -> Result<Vec<String>> {
        if let Some(backend) = self.self_aggregating() {
            debug!("Delegating column listing to self-aggregating source");
            return backend.columns(&self.data_source, &self.query).await;
        }
        self.check_and_load(force_reload).await?;
        self.cache.write().await.query_columns()
    }

    /// Text of the backend query a self-aggregating source would run for
    /// the request, or the `"Not Support"` sentinel. Embedded expressions
    /// are evaluated first and can still fail the call.
    pub async fn get_view_query_text(&self, request: AggregateRequest) -> Result<String> {
        let request = self.resolve_expressions(request)?;
        match self.self_aggregating() {
            Some(backend) => {
                backend
                    .explain_query(&self.data_source, &self.query, &request)
                    .await
            }
            None => Ok(NOT_SUPPORTED.to_string()),
        }
    }

    // == Internals ==
    /// Evaluates embedded expressions across every dimension value of the
    /// request. Measures stay untouched.
    fn resolve_expressions(&self, mut request: AggregateRequest) -> Result<AggregateRequest> {
        for value in request.dimension_values_mut() {
            *value = self.evaluator.resolve(value)?;
        }
        Ok(request)
    }

    /// Checks the descriptor flag activating the self-aggregating route.
    fn aggregate_provider_active(&self) -> bool {
        self.data_source
            .get(AGGREGATE_PROVIDER_KEY)
            .map(|value| value == "true")
            .unwrap_or(false)
    }

    /// The self-aggregating backend, when the source has the capability
    /// and the descriptor flag activates it. Both are required.
    fn self_aggregating(&self) -> Option<&dyn SelfAggregating> {
        if !self.aggregate_provider_active() {
            return None;
        }
        self.source.as_self_aggregating()
    }

    /// Loads the dataset when forced, never loaded, or expired. Holds the
    /// per-key lock across the check and the load, so concurrent callers
    /// for the same key fetch at most once; a fetch failure releases the
    /// lock and leaves the cache untouched.
    async fn check_and_load(&self, force_reload: bool) -> Result<()> {
        let key = derive_cache_key(&self.data_source, &self.query);
        let _guard = self.locks.lock_for(&key).await;

        let needs_load = {
            let cache = self.cache.read().await;
            force_reload || !cache.exists() || cache.is_stale()
        };
        if !needs_load {
            debug!("Cache hit for key {}, skipping load", key);
            return Ok(());
        }

        let rows = self
            .source
            .fetch(&self.data_source, &self.query)
            .await
            .map_err(ProviderError::Fetch)?;
        let row_count = self
            .cache
            .write()
            .await
            .load(rows, self.config.refresh_interval_secs)?;
        info!("Loaded {} rows for key {}", row_count, key);
        Ok(())
    }
}
