//! CLI commands and handlers
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::application::monitor_job::{JobContext, MonitorJob, ReadingSource};
use crate::application::scheduler::Scheduler;
use crate::application::sources::{
    NetworkPriceSource, PoolSource, PriceSource, VaultBalanceSource, WalletBalanceSource,
};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::detection::StorePriceLookup;
use crate::domain::lock::NotificationLock;
use crate::domain::monitor::MonitorKind;
use crate::domain::snapshot::SnapshotStore;
use crate::infrastructure::notify::{AlertDispatcher, DiscordWebhook, LogDispatcher};
use crate::infrastructure::store::{MemoryStore, RedisStore};
use crate::infrastructure::thornode::{ChainDataSource, ThornodeClient};
use crate::shared::config::{AppConfig, StoreBackend};
use crate::shared::errors::AppError;

#[derive(Parser)]
#[command(name = "thorwatch", version)]
#[command(about = "THORChain vault, pool, price and wallet watcher")]
pub struct Cli {
    /// Path to the TOML config file (default: ./thorwatch.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Detect and record changes without locking or sending alerts
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every enabled monitor on its schedule until interrupted
    Run,

    /// Run a single tick and exit
    Once {
        /// Only this monitor (vault_balance, pool, prices, network_price, wallet_balance)
        #[arg(short, long)]
        monitor: Option<String>,
    },

    /// Load and validate the configuration, then print the effective settings
    CheckConfig,
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(command: Commands, config: AppConfig) -> Result<(), AppError> {
        match command {
            Commands::Run => Self::execute_run_command(config).await,
            Commands::Once { monitor } => {
                let only = monitor
                    .map(|name| name.parse::<MonitorKind>().map_err(|_| AppError::UnknownMonitor(name)))
                    .transpose()?;
                Self::execute_once_command(config, only).await
            }
            Commands::CheckConfig => Self::execute_check_config_command(&config),
        }
    }

    async fn execute_run_command(config: AppConfig) -> Result<(), AppError> {
        let scheduler = Scheduler::new(Self::build_jobs(&config, None).await?, &config.schedule);

        scheduler
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "failed to listen for ctrl-c");
                }
            })
            .await;
        Ok(())
    }

    async fn execute_once_command(config: AppConfig, only: Option<MonitorKind>) -> Result<(), AppError> {
        let scheduler = Scheduler::new(Self::build_jobs(&config, only).await?, &config.schedule);

        let failure = scheduler
            .run_once()
            .await
            .into_iter()
            .find_map(|(_, outcome)| outcome.err());
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn execute_check_config_command(config: &AppConfig) -> Result<(), AppError> {
        info!(
            backend = ?config.store.backend,
            key_prefix = %config.store.key_prefix,
            thornode = %config.thornode.base_url,
            webhook = config.alerts.webhook_url.is_some(),
            do_not_alert = config.alerts.do_not_alert,
            interval_secs = config.schedule.interval_secs,
            fast_interval_secs = ?config.schedule.fast_interval_secs,
            "configuration is valid"
        );
        for kind in MonitorKind::ALL {
            let settings = config.monitor_settings(kind);
            info!(
                monitor = %kind,
                enabled = settings.enabled,
                fast = settings.fast,
                threshold_percent = settings.threshold_percent,
                threshold_mode = ?settings.threshold_mode,
                cooldown_secs = settings.cooldown_secs,
                lookback_minutes = ?settings.lookback_minutes,
                margin_minutes = settings.margin_minutes,
                retention_secs = settings.retention_secs,
                floor_usd = ?settings.significance.as_ref().map(|s| s.floor_usd),
                "monitor"
            );
        }
        info!(
            wallets = config.wallets.len(),
            pool_properties = config.pools.properties.len(),
            "tracked entities"
        );
        Ok(())
    }

    /// Wire the enabled monitors (or just `only`, even when disabled).
    /// Every monitor built is validated, since `validate` skips disabled ones.
    async fn build_jobs(config: &AppConfig, only: Option<MonitorKind>) -> Result<Vec<MonitorJob>, AppError> {
        let selected: Vec<MonitorKind> = MonitorKind::ALL
            .into_iter()
            .filter(|kind| match only {
                Some(only) => only == *kind,
                None => config.monitor_settings(*kind).enabled,
            })
            .collect();
        let settings = selected
            .iter()
            .map(|kind| config.validate_monitor(*kind))
            .collect::<Result<Vec<_>, _>>()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (store, lock) = Self::build_store(config, clock.clone()).await?;
        let dispatcher = Self::build_dispatcher(config)?;
        let chain: Arc<dyn ChainDataSource> = Arc::new(ThornodeClient::new(
            &config.thornode.base_url,
            &config.thornode.client_id,
            Duration::from_secs(config.thornode.timeout_secs),
        )?);

        let price_margin = config.monitor_settings(MonitorKind::Prices).margin();
        let ctx = JobContext {
            store: store.clone(),
            lock,
            dispatcher,
            clock: clock.clone(),
            prices: Some(Arc::new(StorePriceLookup::new(store, clock, price_margin))),
            do_not_alert: config.alerts.do_not_alert,
            throttle: config.throttle(),
        };
        if ctx.do_not_alert {
            warn!("dry run: alerts are logged, never sent");
        }

        let mut jobs = Vec::with_capacity(selected.len());
        for (kind, settings) in selected.into_iter().zip(settings) {
            let source: Arc<dyn ReadingSource> = match kind {
                MonitorKind::VaultBalance => Arc::new(VaultBalanceSource::new(chain.clone())),
                MonitorKind::Pool => Arc::new(PoolSource::new(chain.clone(), config.pools.properties.clone())),
                MonitorKind::Prices => Arc::new(PriceSource::new(chain.clone())),
                MonitorKind::NetworkPrice => Arc::new(NetworkPriceSource::new(chain.clone())),
                MonitorKind::WalletBalance => Arc::new(WalletBalanceSource::new(chain.clone(), config.wallets.clone())),
            };
            jobs.push(MonitorJob::new(source, settings, ctx.clone()));
        }

        Ok(jobs)
    }

    async fn build_store(
        config: &AppConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Arc<dyn SnapshotStore>, Arc<dyn NotificationLock>), AppError> {
        match config.store.backend {
            StoreBackend::Redis => {
                let store = Arc::new(RedisStore::connect(&config.store.redis_url, &config.store.key_prefix).await?);
                store.ping().await?;
                let snapshots: Arc<dyn SnapshotStore> = store.clone();
                let lock: Arc<dyn NotificationLock> = store;
                Ok((snapshots, lock))
            }
            StoreBackend::Memory => {
                warn!("using in-memory store, history is lost on restart");
                let store = Arc::new(MemoryStore::new(clock));
                let snapshots: Arc<dyn SnapshotStore> = store.clone();
                let lock: Arc<dyn NotificationLock> = store;
                Ok((snapshots, lock))
            }
        }
    }

    fn build_dispatcher(config: &AppConfig) -> Result<Arc<dyn AlertDispatcher>, AppError> {
        match &config.alerts.webhook_url {
            Some(url) => Ok(Arc::new(DiscordWebhook::new(
                url,
                &config.alerts.username,
                Duration::from_secs(config.thornode.timeout_secs),
            )?)),
            None => {
                warn!("no webhook configured, alerts are only logged");
                Ok(Arc::new(LogDispatcher))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_once_with_monitor() {
        let cli = Cli::try_parse_from(["thorwatch", "--dry-run", "once", "--monitor", "pool"]).unwrap();
        assert!(cli.dry_run);
        assert!(matches!(cli.command, Commands::Once { monitor: Some(ref m) } if m == "pool"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["thorwatch", "check-config", "--config", "alt.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Commands::CheckConfig));
    }

    #[tokio::test]
    async fn test_unknown_monitor_is_rejected() {
        let err = CommandExecutor::execute(
            Commands::Once {
                monitor: Some("vaults".into()),
            },
            AppConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UnknownMonitor(ref name) if name == "vaults"));
    }

    #[tokio::test]
    async fn test_build_jobs_with_memory_store() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.monitors.insert(
            MonitorKind::Pool,
            crate::shared::config::MonitorOverrides {
                enabled: Some(false),
                ..Default::default()
            },
        );

        let jobs = CommandExecutor::build_jobs(&config, None).await.unwrap();
        let kinds: Vec<MonitorKind> = jobs.iter().map(|j| j.kind()).collect();
        assert_eq!(kinds.len(), 4);
        assert!(!kinds.contains(&MonitorKind::Pool));

        // explicitly selected monitors run even when disabled
        let only = CommandExecutor::build_jobs(&config, Some(MonitorKind::Pool)).await.unwrap();
        assert_eq!(only.len(), 1);
    }

    #[tokio::test]
    async fn test_once_rejects_invalid_disabled_monitor() {
        let mut config = AppConfig::from_toml(
            "[store]\nbackend = \"memory\"\n[monitors.pool]\nenabled = false\nthreshold_percent = 0\nmargin_minutes = 0\n",
        )
        .unwrap();
        config.validate().unwrap();
        config.alerts.do_not_alert = true;

        let err = CommandExecutor::execute(
            Commands::Once {
                monitor: Some("pool".into()),
            },
            config.clone(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));

        // the regular run leaves the disabled monitor out entirely
        let jobs = CommandExecutor::build_jobs(&config, None).await.unwrap();
        assert!(jobs.iter().all(|j| j.kind() != MonitorKind::Pool));
    }
}
