//! Economic significance filter
//!
//! A large percentage move on a tiny balance is noise. Monitors that opt in
//! convert the absolute change to USD and drop candidates below a floor.

use async_trait::async_trait;
use num_bigint::BigInt;
use num_traits::Signed;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::clock::Clock;
use crate::domain::monitor::{MissingPricePolicy, SignificanceSettings};
use crate::domain::snapshot::SnapshotStore;
use crate::shared::errors::StoreError;
use crate::shared::types::{Amount, MetricKey};

/// Decimals of USD prices and of chain amounts.
pub const USD_DECIMALS: u32 = 8;

/// Latest known USD price of an asset, 8-decimal fixed point.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn usd_price(&self, asset: &str) -> Result<Option<Amount>, StoreError>;
}

/// Outcome of the significance check for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Significance {
    Significant { usd: BigInt },
    BelowFloor { usd: BigInt },
    NoPrice,
}

impl Significance {
    pub fn assess(abs_change: &BigInt, usd_price: Option<&Amount>, floor_usd: u64) -> Self {
        let Some(price) = usd_price else {
            return Significance::NoPrice;
        };
        let usd = usd_value(abs_change, price);
        let floor = BigInt::from(floor_usd) * BigInt::from(10u32).pow(USD_DECIMALS);
        if usd < floor {
            Significance::BelowFloor { usd }
        } else {
            Significance::Significant { usd }
        }
    }
}

impl SignificanceSettings {
    pub fn admits(&self, significance: &Significance) -> bool {
        match significance {
            Significance::Significant { .. } => true,
            Significance::BelowFloor { .. } => false,
            Significance::NoPrice => self.missing_price == MissingPricePolicy::PassThrough,
        }
    }
}

/// USD value (8 dp) of an 8-dp amount at an 8-dp USD price.
pub fn usd_value(amount: &BigInt, usd_price: &Amount) -> BigInt {
    amount.abs() * usd_price / BigInt::from(10u32).pow(USD_DECIMALS)
}

/// Reads prices from the `price:{asset}` series written by the price monitor.
pub struct StorePriceLookup {
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    margin: Duration,
}

impl StorePriceLookup {
    pub fn new(store: Arc<dyn SnapshotStore>, clock: Arc<dyn Clock>, margin: Duration) -> Self {
        Self { store, clock, margin }
    }
}

#[async_trait]
impl PriceLookup for StorePriceLookup {
    async fn usd_price(&self, asset: &str) -> Result<Option<Amount>, StoreError> {
        let key = MetricKey::price(asset);
        let nearest = self
            .store
            .find_nearest(&key, self.clock.now_ms(), self.margin)
            .await?;
        Ok(nearest.map(|s| s.value).filter(|v| v.is_positive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use crate::infrastructure::store::MemoryStore;

    const E8: i64 = 100_000_000;

    fn settings(missing_price: MissingPricePolicy) -> SignificanceSettings {
        SignificanceSettings {
            floor_usd: 100_000,
            missing_price,
        }
    }

    #[test]
    fn test_usd_value() {
        // 2 BTC at $60,000
        let usd = usd_value(&BigInt::from(2 * E8), &BigInt::from(60_000 * E8));
        assert_eq!(usd, BigInt::from(120_000 * E8));
    }

    #[test]
    fn test_assess_against_floor() {
        let price = BigInt::from(60_000 * E8);
        let big = Significance::assess(&BigInt::from(2 * E8), Some(&price), 100_000);
        assert!(matches!(big, Significance::Significant { .. }));

        let small = Significance::assess(&BigInt::from(E8), Some(&price), 100_000);
        assert_eq!(small, Significance::BelowFloor { usd: BigInt::from(60_000 * E8) });

        assert_eq!(Significance::assess(&BigInt::from(E8), None, 100_000), Significance::NoPrice);
    }

    #[test]
    fn test_missing_price_policy() {
        assert!(!settings(MissingPricePolicy::Suppress).admits(&Significance::NoPrice));
        assert!(settings(MissingPricePolicy::PassThrough).admits(&Significance::NoPrice));
        assert!(!settings(MissingPricePolicy::PassThrough)
            .admits(&Significance::BelowFloor { usd: BigInt::from(1) }));
    }

    #[tokio::test]
    async fn test_store_price_lookup_reads_price_series() {
        let clock = Arc::new(ManualClock::new(10 * 60_000));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        store
            .put(
                &MetricKey::price("BTC.BTC"),
                9 * 60_000,
                &BigInt::from(60_000 * E8),
                Duration::from_secs(7200),
            )
            .await
            .unwrap();

        let lookup = StorePriceLookup::new(store, clock, Duration::from_secs(300));
        assert_eq!(lookup.usd_price("BTC.BTC").await.unwrap(), Some(BigInt::from(60_000 * E8)));
        assert_eq!(lookup.usd_price("ETH.ETH").await.unwrap(), None);
    }
}
