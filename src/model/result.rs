//! Aggregate Result Module
//!
//! The tabular result returned by aggregated-view queries.

use serde::{Deserialize, Serialize};

// == Aggregate Result ==
/// A rectangular result table: a header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Output column names
    pub columns: Vec<String>,
    /// Data rows, each aligned with `columns`
    pub rows: Vec<Vec<String>>,
}

impl AggregateResult {
    /// Creates a new result table.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Creates an empty result with the given header.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
