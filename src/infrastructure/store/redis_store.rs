//! Redis (or Valkey) snapshot store and lock
//!
//! Data model:
//!   {prefix}{metric}:time:{timestamp_ms}  -> decimal string   (TTL: monitor retention)
//!   {prefix}{metric}:index                -> zset of timestamps (TTL: monitor retention)
//!   {prefix}lock:{metric}                 -> "1"              (TTL: monitor cooldown)
//!
//! With an empty prefix the layout matches what earlier deployments of the
//! watcher wrote, so an existing database keeps serving as history. Series
//! without an index are enumerated with `SCAN MATCH`.

use async_trait::async_trait;
use num_bigint::BigInt;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::lock::NotificationLock;
use crate::domain::snapshot::{margin_bounds, rank_candidates, SnapshotStore};
use crate::shared::errors::StoreError;
use crate::shared::types::{Amount, MetricKey, Snapshot, TimestampMs};

const SCAN_COUNT: usize = 100;

#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisStore {
    /// Connect to Redis. `prefix` namespaces every key; empty means none.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, StoreError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(prefix = prefix, "connected to Redis");
        Ok(Self {
            conn,
            prefix: namespace(prefix),
        })
    }

    /// Test connectivity.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(response = %pong, "Redis ping");
        Ok(())
    }

    fn series_prefix(&self, key: &MetricKey) -> String {
        series_prefix(&self.prefix, key)
    }

    fn index_key(&self, key: &MetricKey) -> String {
        index_key(&self.prefix, key)
    }

    fn lock_key(&self, key: &MetricKey) -> String {
        format!("{}lock:{}", self.prefix, key)
    }

    /// Every timestamp of a series, by scanning the keyspace.
    async fn scan_timestamps(&self, prefix: &str) -> Result<Vec<TimestampMs>, StoreError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));

        let mut timestamps = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            timestamps.extend(keys.iter().filter_map(|k| parse_timestamp(k, prefix)));
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(timestamps)
    }
}

fn namespace(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with(':') {
        prefix.to_string()
    } else {
        format!("{}:", prefix)
    }
}

fn series_prefix(namespace: &str, key: &MetricKey) -> String {
    format!("{}{}:time:", namespace, key)
}

fn index_key(namespace: &str, key: &MetricKey) -> String {
    format!("{}{}:index", namespace, key)
}

/// Exclusive upper score bound of index entries older than the retention.
fn expired_bound(timestamp: TimestampMs, ttl: Duration) -> String {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    format!("({}", timestamp.saturating_sub(ttl_ms))
}

/// Escape glob meta-characters so `SCAN MATCH` treats the key literally.
fn escape_glob(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Timestamp suffix of a snapshot key belonging to exactly this series.
fn parse_timestamp(redis_key: &str, series_prefix: &str) -> Option<TimestampMs> {
    redis_key.strip_prefix(series_prefix)?.parse().ok()
}

/// Read ranked candidates in order and return the first with an integer
/// payload. Missing payloads (expired after enumeration) and malformed ones
/// fall through to the next candidate.
async fn first_readable<F, Fut>(
    key: &MetricKey,
    candidates: Vec<TimestampMs>,
    mut get: F,
) -> Result<Option<Snapshot>, StoreError>
where
    F: FnMut(TimestampMs) -> Fut,
    Fut: Future<Output = Result<Option<String>, StoreError>>,
{
    for timestamp in candidates {
        let Some(raw) = get(timestamp).await? else {
            debug!(key = %key, timestamp, "snapshot expired before read, skipping");
            continue;
        };
        match raw.trim().parse::<BigInt>() {
            Ok(value) => {
                return Ok(Some(Snapshot {
                    key: key.clone(),
                    timestamp,
                    value,
                }))
            }
            Err(_) => {
                debug!(key = %key, timestamp, payload = %raw, "malformed snapshot payload, skipping");
            }
        }
    }
    Ok(None)
}

#[async_trait]
impl SnapshotStore for RedisStore {
    async fn put(
        &self,
        key: &MetricKey,
        timestamp: TimestampMs,
        value: &Amount,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let redis_key = format!("{}{}", self.series_prefix(key), timestamp);
        let index = self.index_key(key);
        let ttl_secs = ttl.as_secs().max(1);

        let _: () = redis::pipe()
            .atomic()
            .set_ex(&redis_key, value.to_string(), ttl_secs)
            .ignore()
            .zadd(&index, timestamp, timestamp)
            .ignore()
            .zrembyscore(&index, "-inf", expired_bound(timestamp, ttl))
            .ignore()
            .expire(&index, i64::try_from(ttl_secs).unwrap_or(i64::MAX))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn find_nearest(
        &self,
        key: &MetricKey,
        target: TimestampMs,
        margin: Duration,
    ) -> Result<Option<Snapshot>, StoreError> {
        let mut conn = self.conn.clone();
        let prefix = self.series_prefix(key);
        let index = self.index_key(key);
        let (low, high) = margin_bounds(target, margin);

        let members: Vec<String> = conn.zrangebyscore(&index, low, high).await?;
        let timestamps: Vec<TimestampMs> = if members.is_empty() {
            let indexed: bool = conn.exists(&index).await?;
            if indexed {
                return Ok(None);
            }
            // series written before the index existed
            self.scan_timestamps(&prefix).await?
        } else {
            members.iter().filter_map(|m| m.parse().ok()).collect()
        };

        first_readable(key, rank_candidates(timestamps, target, margin), |timestamp| {
            let mut conn = self.conn.clone();
            let redis_key = format!("{}{}", prefix, timestamp);
            async move {
                let raw: Result<Option<String>, redis::RedisError> = conn.get(redis_key).await;
                raw.map_err(StoreError::from)
            }
        })
        .await
    }
}

#[async_trait]
impl NotificationLock for RedisStore {
    async fn try_acquire(&self, key: &MetricKey, cooldown: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        // SET NX EX: check and set in one command
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.lock_key(key))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(cooldown.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_namespace() {
        assert_eq!(namespace(""), "");
        assert_eq!(namespace("thorwatch"), "thorwatch:");
        assert_eq!(namespace("thorwatch:"), "thorwatch:");
    }

    #[test]
    fn test_series_prefix_matches_legacy_layout() {
        let key = MetricKey::pool_property("BTC.BTC", "balance_asset");
        assert_eq!(series_prefix("", &key), "pool:BTC.BTC:balance_asset:time:");
        assert_eq!(
            series_prefix("tw:", &MetricKey::vault("BTC.BTC")),
            "tw:pool:BTC.BTC:time:"
        );
    }

    #[test]
    fn test_parse_timestamp_only_accepts_own_series() {
        let prefix = series_prefix("", &MetricKey::vault("BTC.BTC"));
        assert_eq!(parse_timestamp("pool:BTC.BTC:time:1700000000000", &prefix), Some(1_700_000_000_000));
        assert_eq!(parse_timestamp("pool:BTC.BTC:balance_asset:time:1", &prefix), None);
        assert_eq!(parse_timestamp("pool:BTC.BTC:time:abc", &prefix), None);
    }

    #[test]
    fn test_index_key_sits_beside_the_series() {
        let key = MetricKey::pool_property("BTC.BTC", "balance_asset");
        assert_eq!(index_key("", &key), "pool:BTC.BTC:balance_asset:index");
        assert_eq!(index_key("tw:", &MetricKey::vault("BTC.BTC")), "tw:pool:BTC.BTC:index");
        // never picked up by the legacy scan of the same series
        assert_eq!(parse_timestamp(&index_key("", &key), &series_prefix("", &key)), None);
    }

    #[test]
    fn test_expired_bound() {
        assert_eq!(expired_bound(1_700_000_000_000, Duration::from_secs(7200)), "(1699992800000");
        assert_eq!(expired_bound(0, Duration::MAX), format!("({}", i64::MIN + 1));
    }

    fn payloads(entries: &[(TimestampMs, &str)]) -> HashMap<TimestampMs, String> {
        entries.iter().map(|(ts, raw)| (*ts, raw.to_string())).collect()
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_through_to_next_candidate() {
        let key = MetricKey::price("BTC.BTC");
        let stored = payloads(&[(100, "12.5"), (90, " 4200 "), (130, "7")]);

        let found = first_readable(&key, vec![100, 90, 130], |ts| {
            let raw = stored.get(&ts).cloned();
            async move { Ok::<_, StoreError>(raw) }
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(found.timestamp, 90);
        assert_eq!(found.value, BigInt::from(4200));
    }

    #[tokio::test]
    async fn test_expired_candidate_is_skipped() {
        let key = MetricKey::vault("ETH.ETH");
        // 100 was enumerated but is gone by the time it is read
        let stored = payloads(&[(130, "55")]);
        let mut reads = Vec::new();

        let found = first_readable(&key, vec![100, 130], |ts| {
            reads.push(ts);
            let raw = stored.get(&ts).cloned();
            async move { Ok::<_, StoreError>(raw) }
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(found.timestamp, 130);
        assert_eq!(reads, vec![100, 130]);
    }

    #[tokio::test]
    async fn test_no_readable_candidate_and_read_errors() {
        let key = MetricKey::vault("ETH.ETH");
        let stored = payloads(&[(1, "abc")]);
        let none = first_readable(&key, vec![1, 2], |ts| {
            let raw = stored.get(&ts).cloned();
            async move { Ok::<_, StoreError>(raw) }
        })
        .await
        .unwrap();
        assert!(none.is_none());

        let err = first_readable(&key, vec![1], |_| async {
            Err::<Option<String>, _>(StoreError::Unavailable("down".into()))
        })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("price:ETH.USDC-0X[A]*"), "price:ETH.USDC-0X\\[A\\]\\*");
        assert_eq!(escape_glob("wallet:thor1:rune"), "wallet:thor1:rune");
    }
}
