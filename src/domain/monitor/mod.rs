//! Monitor domain - monitor kinds, their validated alert settings and readings

mod reading;

pub use reading::{AlertContext, Reading};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::detection::DetectionRule;
use crate::shared::errors::ConfigError;

/// The independent periodic monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    VaultBalance,
    Pool,
    Prices,
    NetworkPrice,
    WalletBalance,
}

impl MonitorKind {
    pub const ALL: [MonitorKind; 5] = [
        MonitorKind::VaultBalance,
        MonitorKind::Pool,
        MonitorKind::Prices,
        MonitorKind::NetworkPrice,
        MonitorKind::WalletBalance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MonitorKind::VaultBalance => "vault_balance",
            MonitorKind::Pool => "pool",
            MonitorKind::Prices => "prices",
            MonitorKind::NetworkPrice => "network_price",
            MonitorKind::WalletBalance => "wallet_balance",
        }
    }

    /// Whether readings carry an asset a USD price can be looked up for.
    /// Price series are themselves prices, so a USD floor means nothing there.
    pub fn has_price_asset(&self) -> bool {
        matches!(
            self,
            MonitorKind::VaultBalance | MonitorKind::Pool | MonitorKind::WalletBalance
        )
    }
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MonitorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonitorKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown monitor '{}'", s))
    }
}

/// Whether a change exactly equal to the threshold alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// `pct >= threshold`
    Inclusive,
    /// `pct > threshold`
    Exclusive,
}

impl ThresholdMode {
    pub fn crossed(&self, pct_change: &BigInt, threshold_percent: u64) -> bool {
        let threshold = BigInt::from(threshold_percent);
        match self {
            ThresholdMode::Inclusive => *pct_change >= threshold,
            ThresholdMode::Exclusive => *pct_change > threshold,
        }
    }
}

/// What the significance filter does when no USD price is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPricePolicy {
    Suppress,
    PassThrough,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignificanceSettings {
    /// Minimum absolute change, in whole USD, worth alerting on.
    pub floor_usd: u64,
    pub missing_price: MissingPricePolicy,
}

/// Alert settings of one monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub enabled: bool,
    /// Run on the fast schedule instead of the regular one.
    pub fast: bool,
    pub threshold_percent: u64,
    pub threshold_mode: ThresholdMode,
    pub cooldown_secs: u64,
    pub lookback_minutes: Vec<u64>,
    pub margin_minutes: u64,
    pub retention_secs: u64,
    pub significance: Option<SignificanceSettings>,
}

const DEFAULT_LOOKBACK: [u64; 4] = [1, 10, 30, 60];
const DEFAULT_RETENTION_SECS: u64 = 2 * 60 * 60;
const DEFAULT_FLOOR_USD: u64 = 100_000;

/// Longest supported lookback window or margin: one week.
pub const MAX_WINDOW_MINUTES: u64 = 7 * 24 * 60;

impl MonitorSettings {
    pub fn defaults_for(kind: MonitorKind) -> Self {
        let base = Self {
            enabled: true,
            fast: false,
            threshold_percent: 5,
            threshold_mode: ThresholdMode::Inclusive,
            cooldown_secs: 15 * 60,
            lookback_minutes: DEFAULT_LOOKBACK.to_vec(),
            margin_minutes: 5,
            retention_secs: DEFAULT_RETENTION_SECS,
            significance: None,
        };

        match kind {
            MonitorKind::VaultBalance => Self {
                threshold_percent: 10,
                significance: Some(SignificanceSettings {
                    floor_usd: DEFAULT_FLOOR_USD,
                    missing_price: MissingPricePolicy::PassThrough,
                }),
                ..base
            },
            MonitorKind::Pool | MonitorKind::Prices => base,
            MonitorKind::NetworkPrice => Self {
                fast: true,
                threshold_percent: 1,
                cooldown_secs: 10 * 60,
                ..base
            },
            MonitorKind::WalletBalance => Self {
                threshold_percent: 1,
                significance: Some(SignificanceSettings {
                    floor_usd: DEFAULT_FLOOR_USD,
                    missing_price: MissingPricePolicy::Suppress,
                }),
                ..base
            },
        }
    }

    pub fn validate(&self, kind: MonitorKind) -> Result<(), ConfigError> {
        let section = format!("monitors.{}", kind);

        if self.threshold_percent == 0 {
            return Err(ConfigError::invalid(section, "threshold_percent must be > 0"));
        }
        if self.cooldown_secs == 0 {
            return Err(ConfigError::invalid(section, "cooldown_secs must be > 0"));
        }
        if self.margin_minutes == 0 {
            return Err(ConfigError::invalid(section, "margin_minutes must be > 0"));
        }
        if self.lookback_minutes.is_empty() {
            return Err(ConfigError::invalid(section, "lookback_minutes must not be empty"));
        }
        if self.lookback_minutes.iter().any(|m| *m == 0) {
            return Err(ConfigError::invalid(section, "lookback_minutes entries must be > 0"));
        }
        if self.lookback_minutes.iter().any(|m| *m > MAX_WINDOW_MINUTES) {
            return Err(ConfigError::invalid(
                section,
                format!("lookback_minutes entries must be <= {}", MAX_WINDOW_MINUTES),
            ));
        }
        if self.margin_minutes > MAX_WINDOW_MINUTES {
            return Err(ConfigError::invalid(
                section,
                format!("margin_minutes must be <= {}", MAX_WINDOW_MINUTES),
            ));
        }
        if self.significance.is_some() && !kind.has_price_asset() {
            return Err(ConfigError::invalid(
                section,
                "floor_usd is not supported, readings have no USD price",
            ));
        }

        let oldest = self.lookback_minutes.iter().max().copied().unwrap_or_default();
        let needed_secs = oldest
            .checked_add(self.margin_minutes)
            .and_then(|minutes| minutes.checked_mul(60))
            .ok_or_else(|| ConfigError::invalid(section.clone(), "lookback plus margin overflows"))?;
        if self.retention_secs < needed_secs {
            return Err(ConfigError::invalid(
                section,
                format!(
                    "retention_secs {} does not cover the {} minute lookback plus margin ({}s)",
                    self.retention_secs, oldest, needed_secs
                ),
            ));
        }

        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn margin(&self) -> Duration {
        Duration::from_secs(self.margin_minutes.saturating_mul(60))
    }

    pub fn detection_rule(&self) -> DetectionRule {
        DetectionRule {
            lookback_minutes: self.lookback_minutes.clone(),
            margin: self.margin(),
            threshold_percent: self.threshold_percent,
            threshold_mode: self.threshold_mode,
            significance: self.significance.clone(),
        }
    }
}
