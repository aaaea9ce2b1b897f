//! Cache Key Derivation Module
//!
//! Derives the stable cache key that identifies one logical dataset and
//! doubles as the mutual-exclusion token for its loads.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

/// Connection/target parameters identifying which external system a
/// provider instance talks to. BTreeMap iteration is sorted, so the
/// serialized form is canonical regardless of insertion order.
pub type DataSourceDescriptor = BTreeMap<String, String>;

/// Query-shaping parameters identifying which dataset within that source
/// the provider fetches.
pub type QueryDescriptor = BTreeMap<String, String>;

/// Reserved data-source key whose value `"true"` activates the
/// self-aggregating route for capable sources.
pub const AGGREGATE_PROVIDER_KEY: &str = "aggregateProvider";

// == Cache Key ==
/// Opaque, fixed-length identity of one logical dataset.
///
/// Derived deterministically from the (data-source, query) descriptor pair;
/// two pairs with equal contents always derive equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice (64 hex characters).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Derivation ==
/// Derives the cache key for a (data-source, query) descriptor pair.
///
/// Both maps are serialized to JSON (sorted keys, courtesy of BTreeMap),
/// concatenated, and hashed with SHA-256. Pure function: no side effects,
/// and string-to-string maps cannot fail to serialize.
pub fn derive_cache_key(data_source: &DataSourceDescriptor, query: &QueryDescriptor) -> CacheKey {
    let serialized = format!(
        "{}{}",
        serde_json::to_string(data_source).expect("string map serialization cannot fail"),
        serde_json::to_string(query).expect("string map serialization cannot fail"),
    );

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    CacheKey(hex::encode(hasher.finalize()))
}
