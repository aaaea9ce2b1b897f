//! Configuration Module
//!
//! Handles the per-provider tuning knobs with environment overrides.

use std::env;

/// Default refresh interval: 12 hours.
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 12 * 60 * 60;

/// Default advisory result-row limit.
pub const DEFAULT_RESULT_LIMIT: usize = 300_000;

/// Provider configuration parameters.
///
/// All values can be configured via environment variables with sensible
/// defaults. The result limit is advisory only: the core hands it to the
/// aggregation collaborator and never enforces it itself.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Seconds a loaded dataset stays fresh before the next request
    /// triggers a reload
    pub refresh_interval_secs: u64,
    /// Advisory cap on aggregate result rows, consumed by the aggregation
    /// collaborator
    pub result_limit: usize,
}

impl ProviderConfig {
    /// Creates a new ProviderConfig by loading values from environment
    /// variables.
    ///
    /// # Environment Variables
    /// - `REFRESH_INTERVAL_SECS` - Dataset freshness window in seconds (default: 43200)
    /// - `RESULT_LIMIT` - Advisory result-row limit (default: 300000)
    pub fn from_env() -> Self {
        Self {
            refresh_interval_secs: env::var("REFRESH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
            result_limit: env::var("RESULT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RESULT_LIMIT),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}
