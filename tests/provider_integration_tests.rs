//! Integration tests for the data provider
//!
//! Exercises the cross-task concurrency guarantees end to end: one load
//! per key however many tasks ask, parallel loads for distinct keys, and
//! recovery after failed loads.

use aggcache::{
    AggregateRequest, AggregateResult, Aggregator, CachedDataset, DataProvider,
    DataSourceDescriptor, LockRegistry, QueryDescriptor, RawDataSource,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;
use tokio::time::{sleep, timeout};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn descriptor(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn sample_rows() -> Vec<Vec<String>> {
    vec![
        vec!["region".to_string(), "amount".to_string()],
        vec!["north".to_string(), "10".to_string()],
        vec!["south".to_string(), "20".to_string()],
    ]
}

/// Returns the cached table itself, so tests can see exactly which
/// dataset a query was answered from.
struct EchoAggregator;

impl Aggregator for EchoAggregator {
    fn aggregate(
        &self,
        dataset: &CachedDataset,
        _request: &AggregateRequest,
    ) -> aggcache::Result<AggregateResult> {
        Ok(AggregateResult::new(
            dataset.header().to_vec(),
            dataset.data_rows().to_vec(),
        ))
    }
}

/// Counts fetches and holds each one open long enough for concurrent
/// callers to pile up on the key lock.
struct SlowCountingSource {
    fetches: AtomicUsize,
}

impl SlowCountingSource {
    fn new() -> Self {
        Self {
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RawDataSource for SlowCountingSource {
    async fn fetch(
        &self,
        _data_source: &DataSourceDescriptor,
        _query: &QueryDescriptor,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;
        Ok(sample_rows())
    }
}

/// Blocks inside fetch until a second fetch arrives at the same barrier.
struct RendezvousSource {
    barrier: Arc<Barrier>,
}

#[async_trait]
impl RawDataSource for RendezvousSource {
    async fn fetch(
        &self,
        _data_source: &DataSourceDescriptor,
        _query: &QueryDescriptor,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        self.barrier.wait().await;
        Ok(sample_rows())
    }
}

/// Tracks how many fetches ever run at the same time.
struct OverlapSource {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetches: AtomicUsize,
}

impl OverlapSource {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RawDataSource for OverlapSource {
    async fn fetch(
        &self,
        _data_source: &DataSourceDescriptor,
        _query: &QueryDescriptor,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(sample_rows())
    }
}

/// Returns a different dataset revision on every fetch, holding each
/// fetch open long enough for other requests to pile up behind it.
struct VersionedSource {
    calls: AtomicUsize,
}

impl VersionedSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RawDataSource for VersionedSource {
    async fn fetch(
        &self,
        _data_source: &DataSourceDescriptor,
        _query: &QueryDescriptor,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        let revision = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(Duration::from_millis(50)).await;
        Ok(vec![
            vec!["revision".to_string()],
            vec![revision.to_string()],
        ])
    }
}

/// Fails the first fetch, succeeds afterwards.
struct FlakySource {
    calls: AtomicUsize,
}

impl FlakySource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RawDataSource for FlakySource {
    async fn fetch(
        &self,
        _data_source: &DataSourceDescriptor,
        _query: &QueryDescriptor,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("transient backend failure");
        }
        Ok(sample_rows())
    }
}

fn build_provider(name: &str, source: Arc<dyn RawDataSource>) -> DataProvider {
    init_tracing();
    DataProvider::new(
        descriptor(&[("name", name)]),
        descriptor(&[("sql", "select region, amount from sales")]),
        source,
        Arc::new(EchoAggregator),
    )
    .with_lock_registry(Arc::new(LockRegistry::new()))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_requests_share_a_single_load() {
    let source = Arc::new(SlowCountingSource::new());
    let provider = Arc::new(build_provider("sales", source.clone()));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move {
            provider.get_aggregate_data(AggregateRequest::new(), false).await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.rows.len(), 2);
    }
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(provider.cache_stats().await.loads, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fresh_cache_serves_all_requests_without_fetching() {
    let source = Arc::new(SlowCountingSource::new());
    let provider = Arc::new(build_provider("sales", source.clone()));

    provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await
        .unwrap();
    assert_eq!(source.fetch_count(), 1);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move {
            provider.get_aggregate_data(AggregateRequest::new(), false).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_distinct_datasets_load_in_parallel() {
    // Each fetch waits for the other inside the barrier, so the test can
    // only pass when neither load blocks the other.
    let barrier = Arc::new(Barrier::new(2));
    let registry = Arc::new(LockRegistry::new());

    let first = Arc::new(
        build_provider(
            "sales",
            Arc::new(RendezvousSource {
                barrier: barrier.clone(),
            }),
        )
        .with_lock_registry(registry.clone()),
    );
    let second = Arc::new(
        build_provider(
            "inventory",
            Arc::new(RendezvousSource {
                barrier: barrier.clone(),
            }),
        )
        .with_lock_registry(registry.clone()),
    );

    let first_task = tokio::spawn(async move { first.get_columns(false).await });
    let second_task = tokio::spawn(async move { second.get_columns(false).await });

    let joined = timeout(Duration::from_secs(2), async {
        (first_task.await, second_task.await)
    })
    .await
    .expect("parallel loads deadlocked");

    assert_eq!(joined.0.unwrap().unwrap(), vec!["region", "amount"]);
    assert_eq!(joined.1.unwrap().unwrap(), vec!["region", "amount"]);
    assert_eq!(registry.len().await, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_same_key_loads_never_overlap_across_instances() {
    // Two provider instances with equal descriptors share one registry,
    // so their loads must serialize even though their caches are separate.
    let source = Arc::new(OverlapSource::new());
    let registry = Arc::new(LockRegistry::new());

    let first = Arc::new(
        build_provider("sales", source.clone()).with_lock_registry(registry.clone()),
    );
    let second = Arc::new(
        build_provider("sales", source.clone()).with_lock_registry(registry.clone()),
    );
    assert_eq!(first.cache_key(), second.cache_key());

    let first_task = {
        let provider = first.clone();
        tokio::spawn(async move { provider.get_aggregate_data(AggregateRequest::new(), false).await })
    };
    let second_task = {
        let provider = second.clone();
        tokio::spawn(async move { provider.get_aggregate_data(AggregateRequest::new(), false).await })
    };

    first_task.await.unwrap().unwrap();
    second_task.await.unwrap().unwrap();

    // One load per instance, never at the same time
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_reload_serves_the_reloaded_dataset() {
    let source = Arc::new(VersionedSource::new());
    let provider = build_provider("sales", source.clone());

    let first = provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await
        .unwrap();
    assert_eq!(first.rows, vec![vec!["1".to_string()]]);

    let cached = provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await
        .unwrap();
    assert_eq!(cached.rows, vec![vec!["1".to_string()]]);

    let reloaded = provider
        .get_aggregate_data(AggregateRequest::new(), true)
        .await
        .unwrap();
    assert_eq!(reloaded.rows, vec![vec!["2".to_string()]]);
    assert_eq!(provider.cache_stats().await.loads, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_forced_reload_wins_against_a_pending_request() {
    let source = Arc::new(VersionedSource::new());
    let provider = Arc::new(build_provider("sales", source.clone()));

    let warmed = provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await
        .unwrap();
    assert_eq!(warmed.rows, vec![vec!["1".to_string()]]);

    let pending = {
        let provider = provider.clone();
        tokio::spawn(async move {
            provider
                .get_aggregate_data(AggregateRequest::new(), false)
                .await
        })
    };
    let forced = {
        let provider = provider.clone();
        tokio::spawn(async move {
            provider
                .get_aggregate_data(AggregateRequest::new(), true)
                .await
        })
    };

    let forced_result = forced.await.unwrap().unwrap();
    let pending_result = pending.await.unwrap().unwrap();

    // The forced caller gets the dataset its own reload produced, no
    // matter which side took the key lock first
    assert_eq!(forced_result.rows, vec![vec!["2".to_string()]]);
    // The pending caller is served rev 1 or rev 2 depending on lock
    // order, but the warm cache means it never fetches on its own
    assert!(
        pending_result.rows == vec![vec!["1".to_string()]]
            || pending_result.rows == vec![vec!["2".to_string()]]
    );
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(provider.cache_stats().await.loads, 2);

    let after = provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await
        .unwrap();
    assert_eq!(after.rows, vec![vec!["2".to_string()]]);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_load_is_retried_by_the_next_request() {
    let source = Arc::new(FlakySource::new());
    let provider = build_provider("sales", source.clone());

    let first = provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await;
    assert!(first.is_err());
    assert_eq!(provider.cache_stats().await.loads, 0);

    let second = provider
        .get_aggregate_data(AggregateRequest::new(), false)
        .await
        .unwrap();
    assert_eq!(second.rows.len(), 2);
    assert_eq!(source.fetch_count(), 2);
    assert_eq!(provider.cache_stats().await.loads, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mixed_operations_share_one_dataset() {
    let source = Arc::new(SlowCountingSource::new());
    let provider = Arc::new(build_provider("sales", source.clone()));

    let aggregate = {
        let provider = provider.clone();
        tokio::spawn(async move { provider.get_aggregate_data(AggregateRequest::new(), false).await })
    };
    let dimensions = {
        let provider = provider.clone();
        tokio::spawn(async move {
            provider
                .get_dimension_values("region", AggregateRequest::new(), false)
                .await
        })
    };
    let columns = {
        let provider = provider.clone();
        tokio::spawn(async move { provider.get_columns(false).await })
    };

    assert_eq!(aggregate.await.unwrap().unwrap().rows.len(), 2);
    assert_eq!(
        dimensions.await.unwrap().unwrap(),
        vec![vec!["north".to_string()], vec!["south".to_string()]]
    );
    assert_eq!(columns.await.unwrap().unwrap(), vec!["region", "amount"]);
    assert_eq!(source.fetch_count(), 1);
}
