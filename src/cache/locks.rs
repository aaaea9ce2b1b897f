//! Lock Registry Module
//!
//! Per-key async mutexes serializing load transitions. Every cache key
//! maps to exactly one mutex for the lifetime of the process, so two
//! tasks loading the same dataset always contend on the same lock while
//! loads for different datasets proceed in parallel.

use crate::key::CacheKey;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

static GLOBAL: Lazy<Arc<LockRegistry>> = Lazy::new(|| Arc::new(LockRegistry::new()));

// == Lock Registry ==
/// Registry of per-key load locks.
///
/// Entries are created on first use and never removed; a key's lock
/// identity stays stable for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry shared by providers that are not given
    /// their own.
    pub fn global() -> Arc<LockRegistry> {
        GLOBAL.clone()
    }

    /// Acquires the load lock for a key, creating it on first use.
    /// The returned guard holds the lock until dropped.
    pub async fn lock_for(&self, key: &CacheKey) -> OwnedMutexGuard<()> {
        let handle = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(key.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        handle.lock_owned().await
    }

    /// Number of keys with a registered lock.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Checks if no key has been locked yet.
    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
