//! Bank balances of the configured treasury and module wallets

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::{explorer_url, parse_or_skip, token_image, RUNE_ASSET};
use crate::application::monitor_job::ReadingSource;
use crate::domain::monitor::{AlertContext, MonitorKind, Reading};
use crate::infrastructure::thornode::ChainDataSource;
use crate::shared::config::WalletConfig;
use crate::shared::errors::FetchError;
use crate::shared::types::MetricKey;

pub struct WalletBalanceSource {
    chain: Arc<dyn ChainDataSource>,
    wallets: Vec<WalletConfig>,
}

impl WalletBalanceSource {
    pub fn new(chain: Arc<dyn ChainDataSource>, wallets: Vec<WalletConfig>) -> Self {
        Self { chain, wallets }
    }
}

/// Price series asset of a bank denom: `rune` -> `THOR.RUNE`, `btc/btc` -> `BTC.BTC`.
pub fn denom_price_asset(denom: &str) -> String {
    if denom.eq_ignore_ascii_case("rune") {
        RUNE_ASSET.to_string()
    } else {
        denom.to_uppercase().replace('/', ".")
    }
}

#[async_trait]
impl ReadingSource for WalletBalanceSource {
    fn kind(&self) -> MonitorKind {
        MonitorKind::WalletBalance
    }

    async fn fetch(&self) -> Result<Vec<Reading>, FetchError> {
        let mut readings = Vec::new();
        let mut last_error = None;
        let mut fetched = 0;

        for wallet in &self.wallets {
            let balances = match self.chain.balances(&wallet.address).await {
                Ok(balances) => balances,
                Err(e) => {
                    warn!(wallet = %wallet.name, address = %wallet.address, error = %e, "balance fetch failed");
                    last_error = Some(e);
                    continue;
                }
            };
            fetched += 1;

            for balance in balances {
                let Some(amount) = parse_or_skip(self.kind(), &balance.denom, &balance.amount) else {
                    continue;
                };
                let price_asset = denom_price_asset(&balance.denom);
                let context = AlertContext {
                    monitor: MonitorKind::WalletBalance,
                    subject: balance.denom.clone(),
                    detail: Some(wallet.name.clone()),
                    decimals: 8,
                    precision: 0,
                    url: Some(explorer_url(&format!("address/{}", wallet.address))),
                    image_url: Some(token_image(&price_asset)),
                };
                readings.push(
                    Reading::new(MetricKey::wallet(&wallet.address, &balance.denom), amount, context)
                        .with_threshold(wallet.threshold_percent)
                        .with_price_asset(price_asset),
                );
            }
        }

        // only a total outage fails the tick
        match last_error {
            Some(e) if fetched == 0 => Err(e),
            _ => Ok(readings),
        }
    }
}
