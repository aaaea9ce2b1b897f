//! Raw Data Source Module
//!
//! The retrieval boundary. A `RawDataSource` produces the complete raw
//! table for a descriptor pair; a source that can aggregate on its own
//! backend additionally exposes the `SelfAggregating` capability.

use crate::error::Result;
use crate::key::{DataSourceDescriptor, QueryDescriptor};
use crate::model::{AggregateRequest, AggregateResult};
use async_trait::async_trait;

// == Raw Data Source ==
/// Boundary to a concrete backend that can produce raw rows.
#[async_trait]
pub trait RawDataSource: Send + Sync {
    /// Retrieves the complete raw table, header row first.
    ///
    /// Errors are opaque to the caching core and surface verbatim.
    async fn fetch(
        &self,
        data_source: &DataSourceDescriptor,
        query: &QueryDescriptor,
    ) -> anyhow::Result<Vec<Vec<String>>>;

    /// The self-aggregating capability of this source, if it has one.
    fn as_self_aggregating(&self) -> Option<&dyn SelfAggregating> {
        None
    }
}

// == Self-Aggregating Capability ==
/// Capability of a source whose backend aggregates by itself.
///
/// Mirrors the provider surface minus caching. The capability is routed
/// to only when the data-source descriptor also carries
/// `aggregateProvider = "true"`.
#[async_trait]
pub trait SelfAggregating: Send + Sync {
    /// Aggregated view computed by the backend.
    async fn query_aggregate(
        &self,
        data_source: &DataSourceDescriptor,
        query: &QueryDescriptor,
        request: &AggregateRequest,
    ) -> Result<AggregateResult>;

    /// Distinct values of one column, computed by the backend.
    async fn query_dimension_values(
        &self,
        data_source: &DataSourceDescriptor,
        query: &QueryDescriptor,
        column: &str,
        request: &AggregateRequest,
    ) -> Result<Vec<Vec<String>>>;

    /// Column names of the backend view.
    async fn columns(
        &self,
        data_source: &DataSourceDescriptor,
        query: &QueryDescriptor,
    ) -> Result<Vec<String>>;

    /// Text of the query the backend would run for the request.
    async fn explain_query(
        &self,
        data_source: &DataSourceDescriptor,
        query: &QueryDescriptor,
        request: &AggregateRequest,
    ) -> Result<String>;
}
