//! Key-value store for short-lived state.
//!
//! Holds OAuth CSRF state tokens, one-time linking codes, and best-effort
//! usage counters. The trait is the injection seam: tests and the default
//! deployment use [`MemoryStore`]; an external store can be swapped in
//! behind the same contract.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Outcome of a key lookup.
///
/// `Expired` is distinct from `Missing` so that callers validating one-time
/// tokens can tell "expired" apart from "never issued".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// Key present and live.
    Hit(String),
    /// Key existed but its TTL has passed.
    Expired,
    /// Key was never stored (or already consumed).
    Missing,
}

/// Store for TTL-bounded keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stores `value` under `key` for `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration);

    /// Looks up `key`.
    async fn fetch(&self, key: &str) -> Fetched;

    /// Removes `key`.
    async fn remove(&self, key: &str);

    /// Increments the counter at `key`, setting `ttl` on first touch.
    /// Returns the new count. Best-effort: counters are approximate and
    /// non-authoritative.
    async fn increment(&self, key: &str, ttl: Duration) -> u64;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-process store backed by a mutex-guarded map.
///
/// Expired entries are kept as tombstones until the next write touches the
/// map, which is what lets [`KeyValueStore::fetch`] answer `Expired`.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: &str, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        purge_oldest(&mut entries);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn fetch(&self, key: &str) -> Fetched {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => Fetched::Expired,
            Some(entry) => Fetched::Hit(entry.value.clone()),
            None => Fetched::Missing,
        }
    }

    async fn remove(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    async fn increment(&self, key: &str, ttl: Duration) -> u64 {
        let mut entries = self.entries.lock().await;
        let count = match entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                entry.value.parse::<u64>().unwrap_or(0).saturating_add(1)
            }
            _ => 1,
        };

        let expires_at = match entries.get(key) {
            // Keep the original deadline on subsequent increments.
            Some(entry) if !entry.is_expired() => entry.expires_at,
            _ => Instant::now() + ttl,
        };

        entries.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        count
    }
}

/// Drops long-dead tombstones so the map cannot grow without bound.
fn purge_oldest(entries: &mut HashMap<String, Entry>) {
    const GRACE: Duration = Duration::from_secs(3600);
    let now = Instant::now();
    entries.retain(|_, entry| now < entry.expires_at + GRACE);
}
