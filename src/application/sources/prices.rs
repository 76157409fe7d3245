//! USD price of every pool asset, derived from pool depths
//!
//! `price = balance_rune * rune_usd / balance_asset`, all 8-decimal fixed
//! point, with `rune_usd` taken from the network's `rune_price_in_tor`.

use async_trait::async_trait;
use num_traits::{Signed, Zero};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{explorer_url, parse_or_skip, token_image, RUNE_ASSET};
use crate::application::monitor_job::ReadingSource;
use crate::domain::monitor::{AlertContext, MonitorKind, Reading};
use crate::infrastructure::thornode::{ChainDataSource, Pool};
use crate::shared::errors::FetchError;
use crate::shared::types::{parse_amount, Amount, MetricKey};

pub struct PriceSource {
    chain: Arc<dyn ChainDataSource>,
}

impl PriceSource {
    pub fn new(chain: Arc<dyn ChainDataSource>) -> Self {
        Self { chain }
    }

    fn price_reading(asset: &str, price: Amount) -> Reading {
        let context = AlertContext {
            monitor: MonitorKind::Prices,
            subject: asset.to_string(),
            detail: None,
            decimals: 8,
            precision: 2,
            url: Some(explorer_url(&format!("pool/{}", asset))),
            image_url: Some(token_image(asset)),
        };
        Reading::new(MetricKey::price(asset), price, context)
    }
}

/// USD price of a pool's asset, `None` for an empty pool.
pub fn pool_usd_price(pool: &Pool, rune_usd: &Amount) -> Option<Amount> {
    let balance_asset = parse_or_skip(MonitorKind::Prices, "balance_asset", &pool.balance_asset)?;
    let balance_rune = parse_or_skip(MonitorKind::Prices, "balance_rune", &pool.balance_rune)?;
    if !balance_asset.is_positive() {
        debug!(pool = %pool.asset, "no asset depth, skipping price");
        return None;
    }
    Some(balance_rune * rune_usd / balance_asset)
}

#[async_trait]
impl ReadingSource for PriceSource {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Prices
    }

    async fn fetch(&self) -> Result<Vec<Reading>, FetchError> {
        let network = self.chain.network().await?;
        let rune_usd = parse_amount("rune_price_in_tor", &network.rune_price_in_tor)?;
        if rune_usd.is_zero() {
            return Err(FetchError::Empty("rune_price_in_tor".into()));
        }

        let mut pools = self.chain.pools().await?;
        match self.chain.derived_pools().await {
            Ok(derived) => pools.extend(derived),
            Err(e) => warn!(error = %e, "derived pools unavailable, pricing regular pools only"),
        }

        let mut seen = HashSet::new();
        let mut readings = vec![Self::price_reading(RUNE_ASSET, rune_usd.clone())];
        seen.insert(RUNE_ASSET.to_string());

        for pool in &pools {
            if !seen.insert(pool.asset.clone()) {
                continue;
            }
            if let Some(price) = pool_usd_price(pool, &rune_usd) {
                readings.push(Self::price_reading(&pool.asset, price));
            }
        }

        Ok(readings)
    }
}
