//! Aggregate Request Module
//!
//! The request shape consumed by providers: filter/column/row dimensions
//! plus the aggregation directives carried opaquely for the aggregation
//! collaborator.

use serde::{Deserialize, Serialize};

// == Dimension Spec ==
/// One named axis of an aggregate request with its ordered values.
///
/// Each value may be a literal or a `{…}`-delimited expression; the
/// expression pass rewrites values in place before the request is routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Column name the dimension refers to
    pub name: String,
    /// Ordered values (literals or delimited expressions)
    pub values: Vec<String>,
}

impl DimensionSpec {
    /// Creates a new DimensionSpec.
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

// == Measure Spec ==
/// One aggregation directive: which column to aggregate and how.
///
/// Opaque to the core; the aggregation collaborator interprets it. The
/// expression pass never touches measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureSpec {
    /// Column the measure aggregates over
    pub column: String,
    /// Aggregation name (e.g. "sum", "count"), interpreted by the collaborator
    pub aggregation: String,
}

impl MeasureSpec {
    /// Creates a new MeasureSpec.
    pub fn new(column: impl Into<String>, aggregation: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            aggregation: aggregation.into(),
        }
    }
}

// == Aggregate Request ==
/// An aggregated-view request: three ordered dimension lists plus measures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    /// Row-restricting dimensions
    #[serde(default)]
    pub filters: Vec<DimensionSpec>,
    /// Column-axis dimensions
    #[serde(default)]
    pub columns: Vec<DimensionSpec>,
    /// Row-axis dimensions
    #[serde(default)]
    pub rows: Vec<DimensionSpec>,
    /// Aggregation directives, untouched by the expression pass
    #[serde(default)]
    pub measures: Vec<MeasureSpec>,
}

impl AggregateRequest {
    /// Creates an empty request (no dimensions, no measures).
    pub fn new() -> Self {
        Self::default()
    }

    // == Builders ==
    /// Adds a filter dimension.
    pub fn with_filter(mut self, spec: DimensionSpec) -> Self {
        self.filters.push(spec);
        self
    }

    /// Adds a column dimension.
    pub fn with_column(mut self, spec: DimensionSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Adds a row dimension.
    pub fn with_row(mut self, spec: DimensionSpec) -> Self {
        self.rows.push(spec);
        self
    }

    /// Adds a measure.
    pub fn with_measure(mut self, spec: MeasureSpec) -> Self {
        self.measures.push(spec);
        self
    }

    // == Expression Pass Support ==
    /// Mutable view over every dimension value in the request: filters,
    /// then columns, then rows, each in declaration order. This is exactly
    /// the set the expression pass rewrites; measures are excluded.
    pub fn dimension_values_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.filters
            .iter_mut()
            .chain(self.columns.iter_mut())
            .chain(self.rows.iter_mut())
            .flat_map(|spec| spec.values.iter_mut())
    }
}
