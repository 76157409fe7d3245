//! Common types used across the application

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::errors::FetchError;

/// Chain-scale integer amount in minor units.
pub type Amount = BigInt;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Asset of the native RUNE price series.
pub const RUNE_ASSET: &str = "THOR.RUNE";

/// Opaque identifier of one tracked series, e.g. `pool:BTC.BTC:balance_rune`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetricKey(String);

impl MetricKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Total coin balance of an asset across all Asgard vaults.
    pub fn vault(asset: &str) -> Self {
        Self(format!("pool:{}", asset))
    }

    pub fn pool_property(asset: &str, property: &str) -> Self {
        Self(format!("pool:{}:{}", asset, property))
    }

    /// USD price of a pool asset, or a network-level price field.
    pub fn price(series: &str) -> Self {
        Self(format!("price:{}", series))
    }

    pub fn wallet(address: &str, denom: &str) -> Self {
        Self(format!("wallet:{}:{}", address, denom))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MetricKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One recorded value of a series. Never mutated after it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub key: MetricKey,
    pub timestamp: TimestampMs,
    pub value: Amount,
}

/// Parse a numeric-as-string API field into an [`Amount`].
pub fn parse_amount(field: &str, value: &str) -> Result<Amount, FetchError> {
    value
        .trim()
        .parse::<BigInt>()
        .map_err(|_| FetchError::InvalidAmount {
            field: field.to_string(),
            value: value.to_string(),
        })
}
