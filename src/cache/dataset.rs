//! Cached Dataset Module
//!
//! Defines the structure of a cached dataset with TTL support. A dataset
//! is a rectangular table whose first row is the header; it carries the
//! millisecond timestamps used for staleness checks.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns current timestamp in milliseconds
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

fn validate_header(rows: &[Vec<String>]) -> Result<()> {
    match rows.first() {
        None => Err(ProviderError::Internal(
            "dataset has no header row".to_string(),
        )),
        Some(header) if header.is_empty() => Err(ProviderError::Internal(
            "dataset has an empty header row".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

// == Cached Dataset ==
/// A loaded dataset with its expiration.
///
/// The first row of `rows` is the header; every following row is data
/// aligned with it. Construction and deserialization both run the header
/// validation, so every reachable dataset has at least one header column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DatasetSnapshot")]
pub struct CachedDataset {
    /// Header row followed by data rows
    rows: Vec<Vec<String>>,
    /// When the dataset was loaded (ms since epoch)
    loaded_at: u64,
    /// When the dataset becomes stale (ms since epoch)
    expires_at: u64,
}

impl CachedDataset {
    /// Creates a dataset from freshly fetched rows.
    ///
    /// # Arguments
    /// * `rows` - Header row plus data rows
    /// * `ttl_seconds` - How long the dataset stays fresh
    ///
    /// # Returns
    /// An error if the table has no header row or the header is empty.
    pub fn new(rows: Vec<Vec<String>>, ttl_seconds: u64) -> Result<Self> {
        validate_header(&rows)?;
        let loaded_at = current_timestamp_ms();
        let expires_at = loaded_at.saturating_add(ttl_seconds.saturating_mul(1000));
        Ok(Self {
            rows,
            loaded_at,
            expires_at,
        })
    }

    /// Checks if the dataset is stale now.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(current_timestamp_ms())
    }

    /// Checks if the dataset is stale at the given instant.
    /// The expiration instant itself counts as stale.
    pub fn is_stale_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// The header row.
    pub fn header(&self) -> &[String] {
        &self.rows[0]
    }

    /// Data rows, header excluded.
    pub fn data_rows(&self) -> &[Vec<String>] {
        &self.rows[1..]
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len() - 1
    }

    /// Millisecond timestamp of the load.
    pub fn loaded_at(&self) -> u64 {
        self.loaded_at
    }

    /// Position of a column in the header.
    ///
    /// # Returns
    /// `ProviderError::UnknownColumn` when the header has no such column.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.header()
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| ProviderError::UnknownColumn(name.to_string()))
    }
}

// == Snapshot Deserialization ==
/// Wire shape of a serialized dataset; validated before it becomes a
/// `CachedDataset`.
#[derive(Deserialize)]
struct DatasetSnapshot {
    rows: Vec<Vec<String>>,
    loaded_at: u64,
    expires_at: u64,
}

impl TryFrom<DatasetSnapshot> for CachedDataset {
    type Error = ProviderError;

    fn try_from(snapshot: DatasetSnapshot) -> Result<Self> {
        validate_header(&snapshot.rows)?;
        Ok(Self {
            rows: snapshot.rows,
            loaded_at: snapshot.loaded_at,
            expires_at: snapshot.expires_at,
        })
    }
}
