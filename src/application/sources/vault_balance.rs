//! Total balance of every asset across the Asgard vaults

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::{explorer_url, parse_or_skip, token_image};
use crate::application::monitor_job::ReadingSource;
use crate::domain::monitor::{AlertContext, MonitorKind, Reading};
use crate::infrastructure::thornode::ChainDataSource;
use crate::shared::errors::FetchError;
use crate::shared::types::{Amount, MetricKey};

pub struct VaultBalanceSource {
    chain: Arc<dyn ChainDataSource>,
}

impl VaultBalanceSource {
    pub fn new(chain: Arc<dyn ChainDataSource>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ReadingSource for VaultBalanceSource {
    fn kind(&self) -> MonitorKind {
        MonitorKind::VaultBalance
    }

    async fn fetch(&self) -> Result<Vec<Reading>, FetchError> {
        let vaults = self.chain.vaults().await?;
        if vaults.is_empty() {
            return Err(FetchError::Empty("asgard vaults".into()));
        }

        let mut totals: BTreeMap<String, Amount> = BTreeMap::new();
        let mut invalid = BTreeSet::new();
        for coin in vaults.iter().flat_map(|v| &v.coins) {
            match parse_or_skip(self.kind(), &coin.asset, &coin.amount) {
                Some(amount) => *totals.entry(coin.asset.clone()).or_default() += amount,
                None => {
                    invalid.insert(coin.asset.clone());
                }
            }
        }

        // a partial sum would look like a drop
        Ok(totals
            .into_iter()
            .filter(|(asset, _)| !invalid.contains(asset))
            .map(|(asset, total)| {
                let context = AlertContext {
                    monitor: MonitorKind::VaultBalance,
                    subject: asset.clone(),
                    detail: None,
                    decimals: 8,
                    precision: 0,
                    url: Some(explorer_url(&format!("pool/{}", asset))),
                    image_url: Some(token_image(&asset)),
                };
                Reading::new(MetricKey::vault(&asset), total, context).with_price_asset(asset)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sources::fake::{vault, FakeChain};

    #[tokio::test]
    async fn test_sums_coins_across_vaults() {
        let chain = FakeChain {
            vaults: Some(vec![
                vault(&[("BTC.BTC", "100"), ("ETH.ETH", "7")]),
                vault(&[("BTC.BTC", "50")]),
            ]),
            ..FakeChain::default()
        };
        let readings = VaultBalanceSource::new(Arc::new(chain)).fetch().await.unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].key, MetricKey::vault("BTC.BTC"));
        assert_eq!(readings[0].value, Amount::from(150));
        assert_eq!(readings[0].price_asset.as_deref(), Some("BTC.BTC"));
        assert_eq!(readings[1].value, Amount::from(7));
    }

    #[tokio::test]
    async fn test_asset_with_invalid_amount_is_dropped() {
        let chain = FakeChain {
            vaults: Some(vec![
                vault(&[("BTC.BTC", "100"), ("ETH.ETH", "7")]),
                vault(&[("BTC.BTC", "not-a-number")]),
            ]),
            ..FakeChain::default()
        };
        let readings = VaultBalanceSource::new(Arc::new(chain)).fetch().await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].key, MetricKey::vault("ETH.ETH"));
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let down = VaultBalanceSource::new(Arc::new(FakeChain::default()));
        assert!(matches!(down.fetch().await, Err(FetchError::Status { status: 503, .. })));

        let empty = VaultBalanceSource::new(Arc::new(FakeChain {
            vaults: Some(Vec::new()),
            ..FakeChain::default()
        }));
        assert!(matches!(empty.fetch().await, Err(FetchError::Empty(_))));
    }
}
