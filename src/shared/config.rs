//! Configuration: `thorwatch.toml` with every field defaulted, overlaid by
//! environment variables.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::domain::monitor::{
    MissingPricePolicy, MonitorKind, MonitorSettings, SignificanceSettings, ThresholdMode,
};
use crate::shared::errors::ConfigError;
use crate::shared::types::RUNE_ASSET;

pub const DEFAULT_CONFIG_PATH: &str = "thorwatch.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub thornode: ThornodeConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-monitor overrides of the built-in defaults, keyed by monitor name.
    #[serde(default)]
    pub monitors: HashMap<MonitorKind, MonitorOverrides>,
    #[serde(default)]
    pub pools: PoolsConfig,
    #[serde(default = "default_wallets")]
    pub wallets: Vec<WalletConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Redis,
    /// Process-local; history is lost on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Namespace prepended to every key. Empty keeps the legacy layout.
    #[serde(default)]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThornodeConfig {
    #[serde(default = "default_thornode_url")]
    pub base_url: String,
    /// Sent as `x-client-id`.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    /// Discord webhook. Alerts are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    /// Detect and persist, but never lock or dispatch.
    #[serde(default)]
    pub do_not_alert: bool,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Interval for monitors flagged `fast`. Those run on the regular
    /// interval when unset.
    #[serde(default = "default_fast_interval_secs")]
    pub fast_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Optional overrides for one monitor; unset fields keep the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MonitorOverrides {
    pub enabled: Option<bool>,
    pub fast: Option<bool>,
    pub threshold_percent: Option<u64>,
    pub threshold_mode: Option<ThresholdMode>,
    pub cooldown_secs: Option<u64>,
    pub lookback_minutes: Option<Vec<u64>>,
    pub margin_minutes: Option<u64>,
    pub retention_secs: Option<u64>,
    /// `0` disables the significance filter.
    pub floor_usd: Option<u64>,
    pub missing_price: Option<MissingPricePolicy>,
}

impl MonitorOverrides {
    pub fn apply(&self, base: MonitorSettings) -> MonitorSettings {
        let significance = match (self.floor_usd, base.significance) {
            (Some(0), _) => None,
            (Some(floor_usd), Some(current)) => Some(SignificanceSettings { floor_usd, ..current }),
            (Some(floor_usd), None) => Some(SignificanceSettings {
                floor_usd,
                missing_price: MissingPricePolicy::PassThrough,
            }),
            (None, current) => current,
        }
        .map(|s| SignificanceSettings {
            missing_price: self.missing_price.unwrap_or(s.missing_price),
            ..s
        });

        MonitorSettings {
            enabled: self.enabled.unwrap_or(base.enabled),
            fast: self.fast.unwrap_or(base.fast),
            threshold_percent: self.threshold_percent.unwrap_or(base.threshold_percent),
            threshold_mode: self.threshold_mode.unwrap_or(base.threshold_mode),
            cooldown_secs: self.cooldown_secs.unwrap_or(base.cooldown_secs),
            lookback_minutes: self.lookback_minutes.clone().unwrap_or(base.lookback_minutes),
            margin_minutes: self.margin_minutes.unwrap_or(base.margin_minutes),
            retention_secs: self.retention_secs.unwrap_or(base.retention_secs),
            significance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolsConfig {
    #[serde(default = "default_pool_properties")]
    pub properties: Vec<PoolPropertyConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolPropertyConfig {
    pub name: String,
    /// Overrides the pool monitor threshold for this property.
    #[serde(default)]
    pub threshold_percent: Option<u64>,
}

impl PoolPropertyConfig {
    /// Asset whose USD price values this property of `pool_asset`.
    /// `None` for unit counts and other unpriced properties.
    pub fn price_asset(&self, pool_asset: &str) -> Option<String> {
        match self.name.as_str() {
            "balance_asset" => Some(pool_asset.to_string()),
            "balance_rune" => Some(RUNE_ASSET.to_string()),
            _ => None,
        }
    }

    pub fn is_priced(&self) -> bool {
        matches!(self.name.as_str(), "balance_asset" | "balance_rune")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletConfig {
    pub address: String,
    pub name: String,
    pub threshold_percent: u64,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Redis
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_thornode_url() -> String {
    "https://thornode.ninerealms.com".to_string()
}
fn default_client_id() -> String {
    "thorswap-be".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_username() -> String {
    "THORGate".to_string()
}
fn default_throttle_ms() -> u64 {
    1000
}
fn default_interval_secs() -> u64 {
    60
}
fn default_fast_interval_secs() -> Option<u64> {
    Some(30)
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_pool_properties() -> Vec<PoolPropertyConfig> {
    ["balance_asset", "balance_rune"]
        .into_iter()
        .map(|name| PoolPropertyConfig {
            name: name.to_string(),
            threshold_percent: None,
        })
        .collect()
}
fn default_wallets() -> Vec<WalletConfig> {
    [
        ("thor1g98cy3n9mmjrpn0sxmn63lztelera37n8n67c0", "Pool Module", 3),
        ("thor1dheycdevq39qlkxs2a6wuuzyn4aqxhve4qxtxt", "Reserve Module", 1),
        ("thor17gw75axcnr8747pkanye45pnrwk7p9c3cqncsv", "Bond Module", 1),
        ("thor1egxvam70a86jafa8gcg3kqfmfax3s0m2g3m754", "Treasury: LP", 1),
        ("thor14n2q7tpemxcha8zc26j0g5pksx4x3a9xw9ryq9", "Treasury: 2", 1),
        ("thor1qd4my7934h2sn5ag5eaqsde39va4ex2asz3yv5", "Treasury: 1", 1),
        ("thor1wfe7hsuvup27lx04p5al4zlcnx6elsnyft7dzm", "Treasury: LP 2", 1),
    ]
    .into_iter()
    .map(|(address, name, threshold_percent)| WalletConfig {
        address: address.to_string(),
        name: name.to_string(),
        threshold_percent,
    })
    .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            thornode: ThornodeConfig::default(),
            alerts: AlertsConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
            monitors: HashMap::new(),
            pools: PoolsConfig::default(),
            wallets: default_wallets(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            key_prefix: String::new(),
        }
    }
}

impl Default for ThornodeConfig {
    fn default() -> Self {
        Self {
            base_url: default_thornode_url(),
            client_id: default_client_id(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: default_username(),
            do_not_alert: false,
            throttle_ms: default_throttle_ms(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fast_interval_secs: default_fast_interval_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            properties: default_pool_properties(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Built-in defaults with this monitor's overrides applied.
    pub fn monitor_settings(&self, kind: MonitorKind) -> MonitorSettings {
        let base = MonitorSettings::defaults_for(kind);
        match self.monitors.get(&kind) {
            Some(overrides) => overrides.apply(base),
            None => base,
        }
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.alerts.throttle_ms)
    }

    /// Overlay environment values. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("REDIS_URL") {
            self.store.redis_url = url;
        } else if let Some(host) = lookup("REDIS_HOST") {
            let port = lookup("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
            self.store.redis_url = match lookup("REDIS_PASSWORD").filter(|p| !p.is_empty()) {
                Some(password) => format!("redis://:{}@{}:{}", password, host, port),
                None => format!("redis://{}:{}", host, port),
            };
        }
        if let Some(webhook) = lookup("DISCORD_WEBHOOK_URL").filter(|w| !w.is_empty()) {
            self.alerts.webhook_url = Some(webhook);
        }
        if let Some(url) = lookup("THORNODE_URL") {
            self.thornode.base_url = url;
        }
        if let Some(flag) = lookup("DO_NOT_ALERT") {
            self.alerts.do_not_alert = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Validate one monitor's effective settings, enabled or not.
    pub fn validate_monitor(&self, kind: MonitorKind) -> Result<MonitorSettings, ConfigError> {
        let settings = self.monitor_settings(kind);
        settings.validate(kind)?;

        if kind == MonitorKind::Pool && settings.significance.is_some() {
            if let Some(property) = self.pools.properties.iter().find(|p| !p.is_priced()) {
                return Err(ConfigError::invalid(
                    "monitors.pool",
                    format!("floor_usd needs a priced property, {} has no USD price", property.name),
                ));
            }
        }

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::invalid("schedule", "interval_secs must be > 0"));
        }
        if self.schedule.fast_interval_secs == Some(0) {
            return Err(ConfigError::invalid("schedule", "fast_interval_secs must be > 0"));
        }
        if self.thornode.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("thornode", "base_url must not be empty"));
        }
        if self.store.backend == StoreBackend::Redis && self.store.redis_url.trim().is_empty() {
            return Err(ConfigError::invalid("store", "redis_url must not be empty"));
        }

        for kind in MonitorKind::ALL {
            if self.monitor_settings(kind).enabled {
                self.validate_monitor(kind)?;
            }
        }

        for property in &self.pools.properties {
            if property.name.trim().is_empty() {
                return Err(ConfigError::invalid("pools", "property name must not be empty"));
            }
            if property.threshold_percent == Some(0) {
                return Err(ConfigError::invalid(
                    "pools",
                    format!("threshold_percent of {} must be > 0", property.name),
                ));
            }
        }

        for wallet in &self.wallets {
            if wallet.address.trim().is_empty() {
                return Err(ConfigError::invalid("wallets", format!("wallet '{}' has no address", wallet.name)));
            }
            if wallet.threshold_percent == 0 {
                return Err(ConfigError::invalid(
                    "wallets",
                    format!("threshold_percent of {} must be > 0", wallet.address),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `path` (or `thorwatch.toml` when present), overlay the process
    /// environment and validate.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut config = match path {
            Some(path) => AppConfig::from_toml(&fs::read_to_string(path)?)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                AppConfig::from_toml(&fs::read_to_string(DEFAULT_CONFIG_PATH)?)?
            }
            None => AppConfig::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.thornode.base_url, "https://thornode.ninerealms.com");
        assert_eq!(config.alerts.username, "THORGate");
        assert_eq!(config.schedule.interval_secs, 60);
        assert_eq!(config.wallets.len(), 7);
        assert_eq!(config.wallets[0].threshold_percent, 3);
        assert_eq!(config.pools.properties.len(), 2);
        config.validate().unwrap();
    }

    #[test]
    fn test_monitor_overrides() {
        let config = AppConfig::from_toml(
            r#"
            [monitors.vault_balance]
            threshold_percent = 20
            threshold_mode = "exclusive"
            floor_usd = 250000

            [monitors.pool]
            enabled = false

            [monitors.wallet_balance]
            floor_usd = 0
            "#,
        )
        .unwrap();

        let vault = config.monitor_settings(MonitorKind::VaultBalance);
        assert_eq!(vault.threshold_percent, 20);
        assert_eq!(vault.threshold_mode, ThresholdMode::Exclusive);
        let significance = vault.significance.unwrap();
        assert_eq!(significance.floor_usd, 250_000);
        assert_eq!(significance.missing_price, MissingPricePolicy::PassThrough);
        assert_eq!(vault.cooldown_secs, 900);

        assert!(!config.monitor_settings(MonitorKind::Pool).enabled);
        assert!(config.monitor_settings(MonitorKind::WalletBalance).significance.is_none());
        assert_eq!(
            config.monitor_settings(MonitorKind::Prices),
            MonitorSettings::defaults_for(MonitorKind::Prices)
        );
    }

    #[test]
    fn test_example_config_parses() {
        let config = AppConfig::from_toml(include_str!("../../thorwatch.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.wallets.len(), 2);
        assert_eq!(
            config.monitor_settings(MonitorKind::WalletBalance),
            MonitorSettings::defaults_for(MonitorKind::WalletBalance)
        );
    }

    #[test]
    fn test_unknown_monitor_name_is_rejected() {
        assert!(AppConfig::from_toml("[monitors.vaults]\nenabled = false\n").is_err());
    }

    #[test]
    fn test_wallets_and_pool_properties() {
        let config = AppConfig::from_toml(
            r#"
            [pools]
            properties = [
                { name = "balance_rune", threshold_percent = 8 },
                { name = "LP_units" },
            ]

            [[wallets]]
            address = "thor1abc"
            name = "Ops"
            threshold_percent = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.wallets.len(), 1);
        assert_eq!(config.wallets[0].name, "Ops");
        assert_eq!(config.pools.properties[0].threshold_percent, Some(8));
        assert_eq!(config.pools.properties[1].threshold_percent, None);
    }

    #[test]
    fn test_env_overlay() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_PASSWORD", "s3cret"),
            ("DISCORD_WEBHOOK_URL", "https://discord.test/hook"),
            ("DO_NOT_ALERT", "true"),
        ]));
        assert_eq!(config.store.redis_url, "redis://:s3cret@cache.internal:6380");
        assert_eq!(config.alerts.webhook_url.as_deref(), Some("https://discord.test/hook"));
        assert!(config.alerts.do_not_alert);

        let mut config = AppConfig::default();
        config.apply_env(env(&[("REDIS_URL", "redis://a:1"), ("REDIS_HOST", "ignored"), ("DO_NOT_ALERT", "false")]));
        assert_eq!(config.store.redis_url, "redis://a:1");
        assert!(!config.alerts.do_not_alert);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig::from_toml("[monitors.prices]\nretention_secs = 600\n").unwrap();
        assert!(config.validate().is_err());

        // a disabled monitor is not validated
        let config = AppConfig::from_toml("[monitors.prices]\nenabled = false\nretention_secs = 600\n").unwrap();
        config.validate().unwrap();

        let mut config = AppConfig::default();
        config.wallets[0].address.clear();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml("[schedule]\ninterval_secs = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_floor_requires_a_priced_monitor() {
        let config = AppConfig::from_toml("[monitors.prices]\nfloor_usd = 1\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("monitors.prices"));

        let config = AppConfig::from_toml("[monitors.network_price]\nfloor_usd = 1\n").unwrap();
        assert!(config.validate().is_err());

        // default pool properties are balances with a USD price
        let config = AppConfig::from_toml("[monitors.pool]\nfloor_usd = 1\nmissing_price = \"suppress\"\n").unwrap();
        config.validate().unwrap();

        let config = AppConfig::from_toml(
            r#"
            [monitors.pool]
            floor_usd = 1

            [pools]
            properties = [{ name = "balance_asset" }, { name = "LP_units" }]
            "#,
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LP_units"));

        // floor 0 switches the filter off, so any property is fine
        let config = AppConfig::from_toml(
            "[monitors.vault_balance]\nfloor_usd = 0\n[pools]\nproperties = [{ name = \"LP_units\" }]\n",
        )
        .unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_monitor_checks_disabled_monitors() {
        let config = AppConfig::from_toml(
            "[monitors.pool]\nenabled = false\nthreshold_percent = 0\nmargin_minutes = 0\n",
        )
        .unwrap();
        config.validate().unwrap();
        assert!(config.validate_monitor(MonitorKind::Pool).is_err());
        assert_eq!(config.validate_monitor(MonitorKind::Prices).unwrap().threshold_percent, 5);
    }
}
