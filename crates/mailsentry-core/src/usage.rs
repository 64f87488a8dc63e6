//! Approximate usage counters.
//!
//! Monthly analysis counts per subscriber, kept in the key-value store.
//! Best-effort and non-authoritative: a lost increment is acceptable, so
//! failures here never propagate into the pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::kv::{Fetched, KeyValueStore};
use crate::subscriber::SubscriberId;

/// Counters outlive the month they track by a few days for reporting.
const COUNTER_TTL: Duration = Duration::from_secs(40 * 24 * 3600);

/// Tracks analyses per subscriber per calendar month.
pub struct UsageTracker {
    kv: Arc<dyn KeyValueStore>,
}

impl UsageTracker {
    /// Creates a tracker over the given store.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Records one completed analysis, returning the month's running count.
    pub async fn record_analysis(&self, subscriber: SubscriberId) -> u64 {
        self.kv.increment(&month_key(subscriber), COUNTER_TTL).await
    }

    /// The subscriber's analysis count for the current month.
    pub async fn analyses_this_month(&self, subscriber: SubscriberId) -> u64 {
        match self.kv.fetch(&month_key(subscriber)).await {
            Fetched::Hit(raw) => raw.parse().unwrap_or(0),
            Fetched::Expired | Fetched::Missing => 0,
        }
    }
}

fn month_key(subscriber: SubscriberId) -> String {
    format!("usage:{subscriber}:{}", Utc::now().format("%Y%m"))
}
