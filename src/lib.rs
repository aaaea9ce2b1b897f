//! Aggcache Library
//!
//! A per-key, mutually exclusive data-loading cache layered under a
//! pluggable aggregation engine. Concurrent requests for aggregated
//! views of the same dataset share one expensive raw load, requests for
//! different datasets proceed in parallel, and sources that aggregate on
//! their own backend bypass the cache entirely.
//!
//! Request values may embed a delimited expression such as
//! `{now minus 7 days}`, evaluated at request time against an explicit
//! function whitelist.

pub mod cache;
pub mod config;
pub mod error;
pub mod expr;
pub mod key;
pub mod model;
pub mod provider;

pub use cache::{Aggregator, CacheStats, CachedDataset, InnerCache, LockRegistry};
pub use config::ProviderConfig;
pub use error::{ProviderError, Result};
pub use expr::{Evaluator, ExprFunction, FunctionTable, NowFunction, Value};
pub use key::{
    derive_cache_key, CacheKey, DataSourceDescriptor, QueryDescriptor, AGGREGATE_PROVIDER_KEY,
};
pub use model::{AggregateRequest, AggregateResult, DimensionSpec, MeasureSpec};
pub use provider::{DataProvider, RawDataSource, SelfAggregating, NOT_SUPPORTED};
