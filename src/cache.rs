// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Short-lived key/value staging cache with per-entry TTL.
//!
//! [`ExpiringCache`] is a bounded-lifetime staging area, not a general
//! cache: there is no capacity bound and no eviction policy beyond the
//! per-entry time-to-live. Inserting into an occupied key is rejected
//! rather than silently overwritten, so caller bugs surface immediately.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::AbortHandle;

use crate::error::CacheError;

/// Cache entry holding the value and the handle of its pending expiry task.
struct Entry<V> {
    value: V,
    expiry: AbortHandle,
}

type EntryMap<V> = Arc<Mutex<HashMap<String, Entry<V>>>>;

/// A mapping from string keys to values where each entry is removed
/// automatically once its caller-specified TTL elapses, unless taken out
/// earlier with [`take`](ExpiringCache::take).
///
/// Each `put` spawns one detached Tokio task that sleeps for the TTL and
/// then deletes the entry if it is still present. Manual removal aborts the
/// pending task; the task re-checks existence before deleting, so the race
/// between manual removal and expiry is benign in both directions.
///
/// Cloning the cache is cheap and yields a handle to the same entries.
pub struct ExpiringCache<V> {
    entries: EntryMap<V>,
}

impl<V> ExpiringCache<V>
where
    V: Send + 'static,
{
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get the value for a key, if present and not yet expired.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let entries = lock(&self.entries);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Remove and return the value for a key.
    ///
    /// The entry's pending expiry task is aborted as part of this call.
    /// Returns `None` if the key is absent or already expired.
    pub fn take(&self, key: &str) -> Option<V> {
        let entry = lock(&self.entries).remove(key)?;
        entry.expiry.abort();
        Some(entry.value)
    }

    /// Insert a new entry that expires after `ttl`.
    ///
    /// Fails with [`CacheError::DuplicateKey`] if the key is already
    /// present; there is no implicit overwrite. Must be called within a
    /// Tokio runtime, since the deferred deletion runs as a spawned task.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) -> Result<(), CacheError> {
        let key = key.into();
        let mut entries = lock(&self.entries);
        if entries.contains_key(&key) {
            return Err(CacheError::DuplicateKey(key));
        }

        let task = tokio::spawn(expire_after(Arc::clone(&self.entries), key.clone(), ttl));
        entries.insert(
            key,
            Entry {
                value,
                expiry: task.abort_handle(),
            },
        );
        Ok(())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Check whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lock the entry map, recovering from a poisoned mutex. No invariant in
/// the map can be broken mid-operation, so the data is still usable.
fn lock<V>(
    entries: &Mutex<HashMap<String, Entry<V>>>,
) -> std::sync::MutexGuard<'_, HashMap<String, Entry<V>>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Deferred deletion for one entry. Deleting is idempotent: if the entry
/// was already taken out manually, the lookup misses and this is a no-op.
async fn expire_after<V>(entries: EntryMap<V>, key: String, ttl: Duration) {
    tokio::time::sleep(ttl).await;
    let removed = lock(&entries).remove(&key).is_some();
    if removed {
        tracing::trace!(key = %key, "cache entry expired");
    }
}

impl<V> Clone for ExpiringCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for ExpiringCache<V>
where
    V: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
