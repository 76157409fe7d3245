//! THORNode REST API - the upstream source of vault, pool, network and balance data

pub mod client;
pub mod types;

pub use client::ThornodeClient;
pub use types::{Balance, Coin, Network, Pool, Vault};

use async_trait::async_trait;
use crate::shared::errors::FetchError;

/// Read-only chain data used by the monitors
#[async_trait]
pub trait ChainDataSource: Send + Sync {
    /// Asgard vaults with their coin balances
    async fn vaults(&self) -> Result<Vec<Vault>, FetchError>;

    /// Regular liquidity pools
    async fn pools(&self) -> Result<Vec<Pool>, FetchError>;

    /// Derived (synthetic price) pools
    async fn derived_pools(&self) -> Result<Vec<Pool>, FetchError>;

    /// Network-wide parameters, including the RUNE/TOR price ratios
    async fn network(&self) -> Result<Network, FetchError>;

    /// Bank balances of one account
    async fn balances(&self, address: &str) -> Result<Vec<Balance>, FetchError>;
}
