//! Reading sources: turn THORNode payloads into readings for the monitor job

pub mod network_price;
pub mod pool;
pub mod prices;
pub mod vault_balance;
pub mod wallet_balance;

pub use network_price::NetworkPriceSource;
pub use pool::PoolSource;
pub use prices::PriceSource;
pub use vault_balance::VaultBalanceSource;
pub use wallet_balance::WalletBalanceSource;

use tracing::warn;

use crate::domain::monitor::MonitorKind;
use crate::shared::types::{parse_amount, Amount};

pub use crate::shared::types::RUNE_ASSET;

const IMAGE_BASE: &str = "https://static.thorswap.net/token-list/images";
const EXPLORER_BASE: &str = "https://viewblock.io/thorchain";

fn token_image(asset: &str) -> String {
    format!("{}/{}.png", IMAGE_BASE, asset.to_lowercase().replace('/', "."))
}

fn explorer_url(path: &str) -> String {
    format!("{}/{}", EXPLORER_BASE, path)
}

/// Parse an API amount, logging and dropping values that are not integers.
fn parse_or_skip(monitor: MonitorKind, field: &str, value: &str) -> Option<Amount> {
    match parse_amount(field, value) {
        Ok(amount) => Some(amount),
        Err(e) => {
            warn!(monitor = %monitor, error = %e, "dropping reading");
            None
        }
    }
}
