//! Error types for the provider core
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Provider Error Enum ==
/// Unified error type for the provider core.
///
/// Every error surfaces to the immediate caller; nothing is logged and
/// swallowed. A failed raw fetch releases the per-key lock and leaves the
/// inner cache untouched, so the next request simply retries.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Malformed or disallowed embedded expression; aborts the whole
    /// request before any lock or fetch is attempted
    #[error("Invalid expression: {0}")]
    Expression(String),

    /// Raw data retrieval failed; carries the source's error verbatim
    #[error("Data fetch failed: {0}")]
    Fetch(anyhow::Error),

    /// A query was issued against a cache that has never been loaded
    #[error("Dataset has not been loaded")]
    NotLoaded,

    /// Dimension-value query against a column absent from the header
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Contract violation inside the core (e.g. a header-less load)
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Result Type Alias ==
/// Convenience Result type for the provider core.
pub type Result<T> = std::result::Result<T, ProviderError>;
