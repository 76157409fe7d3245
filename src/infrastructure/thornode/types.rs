//! Response payloads of the THORNode endpoints used by the monitors
//!
//! Amounts arrive as numeric strings in 1e8 units and are kept as strings
//! here; sources convert them with [`crate::shared::types::parse_amount`].

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Coin {
    pub asset: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vault {
    #[serde(default)]
    pub block_height: i64,
    #[serde(default)]
    pub pub_key: String,
    #[serde(default)]
    pub coins: Vec<Coin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pool {
    pub asset: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub balance_asset: String,
    #[serde(default)]
    pub balance_rune: String,
    /// Every other pool field (`pool_units`, `LP_units`, `synth_units`, ...).
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Pool {
    /// Numeric-as-string property by its API name.
    pub fn property(&self, name: &str) -> Option<&str> {
        match name {
            "balance_asset" => Some(self.balance_asset.as_str()),
            "balance_rune" => Some(self.balance_rune.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    #[serde(default)]
    pub rune_price_in_tor: String,
    #[serde(default)]
    pub tor_price_in_rune: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Network {
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "rune_price_in_tor" => Some(self.rune_price_in_tor.as_str()),
            "tor_price_in_rune" => Some(self.tor_price_in_rune.as_str()),
            other => self.extra.get(other).and_then(Value::as_str),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Balance {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BalancesResponse {
    #[serde(default)]
    pub balances: Vec<Balance>,
}
