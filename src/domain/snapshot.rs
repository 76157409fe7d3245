//! Snapshot store contract
//!
//! A store keeps an append-only, TTL-bounded series of `(timestamp, value)`
//! pairs per [`MetricKey`]. Lookups are by proximity: writers stamp snapshots
//! with their own clock roughly once a minute, so an exact-timestamp hit is
//! unlikely and callers instead ask for the snapshot nearest to a target time.

use async_trait::async_trait;
use std::time::Duration;

use crate::shared::errors::StoreError;
use crate::shared::types::{Amount, MetricKey, Snapshot, TimestampMs};

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Record `value` for `key` at `timestamp`, expiring `ttl` after the write.
    /// A second write with the same timestamp replaces the first.
    async fn put(
        &self,
        key: &MetricKey,
        timestamp: TimestampMs,
        value: &Amount,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// The unexpired snapshot closest to `target` within `target ± margin`.
    ///
    /// Equidistant snapshots resolve to the earlier timestamp. An empty or
    /// fully expired series is `Ok(None)`.
    async fn find_nearest(
        &self,
        key: &MetricKey,
        target: TimestampMs,
        margin: Duration,
    ) -> Result<Option<Snapshot>, StoreError>;
}

/// Inclusive `[target - margin, target + margin]` bounds in milliseconds.
pub fn margin_bounds(target: TimestampMs, margin: Duration) -> (TimestampMs, TimestampMs) {
    let margin_ms = i64::try_from(margin.as_millis()).unwrap_or(i64::MAX);
    (target.saturating_sub(margin_ms), target.saturating_add(margin_ms))
}

/// Timestamps inside the margin window, best match first.
///
/// Ordered by distance to `target`, then by timestamp, so ties go to the
/// earlier snapshot. Backends walk this list and return the first candidate
/// whose payload is still readable.
pub fn rank_candidates<I>(timestamps: I, target: TimestampMs, margin: Duration) -> Vec<TimestampMs>
where
    I: IntoIterator<Item = TimestampMs>,
{
    let (start, end) = margin_bounds(target, margin);
    let mut candidates: Vec<TimestampMs> = timestamps
        .into_iter()
        .filter(|ts| *ts >= start && *ts <= end)
        .collect();
    candidates.sort_by_key(|ts| ((ts - target).unsigned_abs(), *ts));
    candidates.dedup();
    candidates
}
