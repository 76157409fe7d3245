//! In-process snapshot store and lock
//!
//! Backs tests and single-process runs. Expiry is evaluated against the
//! injected [`Clock`], so TTLs and cooldowns can be simulated.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::clock::Clock;
use crate::domain::lock::NotificationLock;
use crate::domain::snapshot::{margin_bounds, rank_candidates, SnapshotStore};
use crate::shared::errors::StoreError;
use crate::shared::types::{Amount, MetricKey, Snapshot, TimestampMs};

#[derive(Debug, Clone)]
struct StoredValue {
    value: Amount,
    expires_at: TimestampMs,
}

pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    series: Mutex<HashMap<MetricKey, BTreeMap<TimestampMs, StoredValue>>>,
    locks: Mutex<HashMap<MetricKey, TimestampMs>>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            series: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Unexpired snapshot count for `key`.
    pub async fn live_count(&self, key: &MetricKey) -> usize {
        let now = self.clock.now_ms();
        let series = self.series.lock().await;
        series
            .get(key)
            .map(|points| points.values().filter(|v| v.expires_at > now).count())
            .unwrap_or(0)
    }

    pub async fn is_locked(&self, key: &MetricKey) -> bool {
        let now = self.clock.now_ms();
        let locks = self.locks.lock().await;
        locks.get(key).is_some_and(|expires_at| *expires_at > now)
    }
}

fn expiry(now: TimestampMs, ttl: Duration) -> TimestampMs {
    now.saturating_add(ttl.as_millis() as i64)
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn put(
        &self,
        key: &MetricKey,
        timestamp: TimestampMs,
        value: &Amount,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = self.clock.now_ms();
        let mut series = self.series.lock().await;
        let points = series.entry(key.clone()).or_default();
        points.retain(|_, stored| stored.expires_at > now);
        points.insert(
            timestamp,
            StoredValue {
                value: value.clone(),
                expires_at: expiry(now, ttl),
            },
        );
        Ok(())
    }

    async fn find_nearest(
        &self,
        key: &MetricKey,
        target: TimestampMs,
        margin: Duration,
    ) -> Result<Option<Snapshot>, StoreError> {
        let now = self.clock.now_ms();
        let series = self.series.lock().await;
        let Some(points) = series.get(key) else {
            return Ok(None);
        };

        let (start, end) = margin_bounds(target, margin);
        let live = points
            .range(start..=end)
            .filter(|(_, stored)| stored.expires_at > now)
            .map(|(ts, _)| *ts);

        let best = rank_candidates(live, target, margin).into_iter().next();
        Ok(best.and_then(|ts| {
            points.get(&ts).map(|stored| Snapshot {
                key: key.clone(),
                timestamp: ts,
                value: stored.value.clone(),
            })
        }))
    }
}

#[async_trait]
impl NotificationLock for MemoryStore {
    async fn try_acquire(&self, key: &MetricKey, cooldown: Duration) -> Result<bool, StoreError> {
        let now = self.clock.now_ms();
        let mut locks = self.locks.lock().await;
        if locks.get(key).is_some_and(|expires_at| *expires_at > now) {
            return Ok(false);
        }
        locks.insert(key.clone(), expiry(now, cooldown));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use num_bigint::BigInt;

    const MINUTE: i64 = 60_000;
    const T0: i64 = 1_700_000_000_000;
    const MARGIN: Duration = Duration::from_secs(5 * 60);
    const TTL: Duration = Duration::from_secs(2 * 60 * 60);

    fn setup() -> (Arc<ManualClock>, MemoryStore) {
        let clock = Arc::new(ManualClock::new(T0));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_find_nearest_picks_closest_in_window() {
        let (clock, store) = setup();
        let key = MetricKey::vault("BTC.BTC");
        for (offset, value) in [(0, 100), (3, 103), (7, 107), (12, 112)] {
            store
                .put(&key, T0 + offset * MINUTE, &BigInt::from(value), TTL)
                .await
                .unwrap();
        }
        clock.set(T0 + 20 * MINUTE);

        let found = store.find_nearest(&key, T0 + 6 * MINUTE, MARGIN).await.unwrap().unwrap();
        assert_eq!(found.timestamp, T0 + 7 * MINUTE);
        assert_eq!(found.value, BigInt::from(107));
        assert!((found.timestamp - (T0 + 6 * MINUTE)).abs() <= 5 * MINUTE);
    }

    #[tokio::test]
    async fn test_find_nearest_outside_margin_is_none() {
        let (_, store) = setup();
        let key = MetricKey::vault("BTC.BTC");
        store.put(&key, T0, &BigInt::from(1), TTL).await.unwrap();

        let found = store.find_nearest(&key, T0 + 6 * MINUTE, MARGIN).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_find_nearest_empty_series() {
        let (_, store) = setup();
        let found = store
            .find_nearest(&MetricKey::vault("NONE.NONE"), T0, MARGIN)
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_expired_snapshots_are_invisible() {
        let (clock, store) = setup();
        let key = MetricKey::price("BTC.BTC");
        store.put(&key, T0, &BigInt::from(1), Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.live_count(&key).await, 1);

        clock.advance(Duration::from_secs(61));
        assert!(store.find_nearest(&key, T0, MARGIN).await.unwrap().is_none());
        assert_eq!(store.live_count(&key).await, 0);
    }

    #[tokio::test]
    async fn test_equidistant_tie_prefers_earlier() {
        let (_, store) = setup();
        let key = MetricKey::vault("ETH.ETH");
        store.put(&key, T0 + 2 * MINUTE, &BigInt::from(2), TTL).await.unwrap();
        store.put(&key, T0 - 2 * MINUTE, &BigInt::from(1), TTL).await.unwrap();

        let found = store.find_nearest(&key, T0, MARGIN).await.unwrap().unwrap();
        assert_eq!(found.timestamp, T0 - 2 * MINUTE);
    }

    #[tokio::test]
    async fn test_same_timestamp_later_write_wins() {
        let (_, store) = setup();
        let key = MetricKey::vault("ETH.ETH");
        store.put(&key, T0, &BigInt::from(1), TTL).await.unwrap();
        store.put(&key, T0, &BigInt::from(2), TTL).await.unwrap();

        let found = store.find_nearest(&key, T0, MARGIN).await.unwrap().unwrap();
        assert_eq!(found.value, BigInt::from(2));
        assert_eq!(store.live_count(&key).await, 1);
    }

    #[tokio::test]
    async fn test_out_of_order_writes() {
        let (_, store) = setup();
        let key = MetricKey::vault("ETH.ETH");
        store.put(&key, T0 + 4 * MINUTE, &BigInt::from(4), TTL).await.unwrap();
        store.put(&key, T0 + MINUTE, &BigInt::from(1), TTL).await.unwrap();

        let found = store.find_nearest(&key, T0, MARGIN).await.unwrap().unwrap();
        assert_eq!(found.value, BigInt::from(1));
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let (_, store) = setup();
        store.put(&MetricKey::vault("BTC.BTC"), T0, &BigInt::from(1), TTL).await.unwrap();

        let other = MetricKey::pool_property("BTC.BTC", "balance_asset");
        assert!(store.find_nearest(&other, T0, MARGIN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lock_acquire_then_suppress_then_expire() {
        let (clock, store) = setup();
        let key = MetricKey::vault("BTC.BTC");
        let cooldown = Duration::from_secs(600);

        assert!(store.try_acquire(&key, cooldown).await.unwrap());
        assert!(!store.try_acquire(&key, cooldown).await.unwrap());
        assert!(store.is_locked(&key).await);

        clock.advance(cooldown);
        assert!(store.try_acquire(&key, cooldown).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_is_per_key() {
        let (_, store) = setup();
        let cooldown = Duration::from_secs(600);
        assert!(store.try_acquire(&MetricKey::vault("BTC.BTC"), cooldown).await.unwrap());
        assert!(store.try_acquire(&MetricKey::vault("ETH.ETH"), cooldown).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_concurrent_acquire_has_single_winner() {
        let (_, store) = setup();
        let store = Arc::new(store);
        let key = MetricKey::price("rune_price_in_tor");

        let attempts = (0..16).map(|_| {
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move { store.try_acquire(&key, Duration::from_secs(60)).await.unwrap() })
        });
        let results = futures::future::join_all(attempts).await;
        let winners = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
        assert_eq!(winners, 1);
    }
}
