//! Generic monitor job: fetch, detect, alert, persist

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::domain::clock::Clock;
use crate::domain::detection::{AlertEvent, ChangeDetector, PriceLookup};
use crate::domain::lock::NotificationLock;
use crate::domain::monitor::{AlertContext, MonitorKind, MonitorSettings, Reading};
use crate::domain::snapshot::SnapshotStore;
use crate::infrastructure::notify::{AlertDispatcher, AlertMessage};
use crate::shared::errors::{FetchError, JobError, StoreError};

/// Produces the current readings of one monitor.
#[async_trait]
pub trait ReadingSource: Send + Sync {
    fn kind(&self) -> MonitorKind;

    async fn fetch(&self) -> Result<Vec<Reading>, FetchError>;
}

/// Collaborators shared by every job of a process.
#[derive(Clone)]
pub struct JobContext {
    pub store: Arc<dyn SnapshotStore>,
    pub lock: Arc<dyn NotificationLock>,
    pub dispatcher: Arc<dyn AlertDispatcher>,
    pub clock: Arc<dyn Clock>,
    pub prices: Option<Arc<dyn PriceLookup>>,
    /// Dry run: detect and persist, never lock or dispatch.
    pub do_not_alert: bool,
    /// Pause after each dispatched alert.
    pub throttle: Duration,
}

/// Outcome counters of one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub readings: usize,
    pub alerts_detected: usize,
    pub alerts_dispatched: usize,
    pub alerts_suppressed: usize,
    pub dispatch_failures: usize,
    pub store_failures: usize,
}

pub struct MonitorJob {
    source: Arc<dyn ReadingSource>,
    settings: MonitorSettings,
    ctx: JobContext,
    detector: ChangeDetector,
}

impl MonitorJob {
    pub fn new(source: Arc<dyn ReadingSource>, settings: MonitorSettings, ctx: JobContext) -> Self {
        let mut detector = ChangeDetector::new(ctx.store.clone());
        if let Some(prices) = &ctx.prices {
            detector = detector.with_price_lookup(prices.clone());
        }
        Self {
            source,
            settings,
            ctx,
            detector,
        }
    }

    pub fn kind(&self) -> MonitorKind {
        self.source.kind()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Run one sampling cycle.
    ///
    /// Every reading is handled independently; a failure while alerting on
    /// one never prevents the others from being evaluated or persisted.
    pub async fn run_tick(&self) -> Result<TickReport, JobError> {
        let kind = self.kind();
        let readings = self.source.fetch().await.map_err(|source| JobError::Fetch {
            monitor: kind.to_string(),
            source,
        })?;

        let rule = self.settings.detection_rule();
        let retention = self.settings.retention();
        let mut report = TickReport {
            readings: readings.len(),
            ..TickReport::default()
        };
        let mut last_store_error: Option<StoreError> = None;

        for reading in &readings {
            let now = self.ctx.clock.now_ms();
            let reading_rule = match reading.threshold_percent {
                Some(threshold) => rule.with_threshold(threshold),
                None => rule.clone(),
            };

            let detection = self
                .detector
                .detect(&reading.key, &reading.value, reading.price_asset.as_deref(), &reading_rule, now)
                .await;
            report.alerts_detected += detection.events.len();

            for event in detection.events {
                self.alert(event, &reading.context, &mut report).await;
            }

            if let Err(e) = self.ctx.store.put(&reading.key, now, &reading.value, retention).await {
                warn!(monitor = %kind, key = %reading.key, error = %e, "failed to persist reading");
                report.store_failures += 1;
                last_store_error = Some(e);
            }
        }

        if report.readings > 0 && report.store_failures == report.readings {
            if let Some(source) = last_store_error {
                return Err(JobError::StoreUnavailable {
                    monitor: kind.to_string(),
                    source,
                });
            }
        }

        Ok(report)
    }

    async fn alert(&self, event: AlertEvent, context: &AlertContext, report: &mut TickReport) {
        let message = AlertMessage::new(event, context.clone());
        let key = &message.event.key;

        if self.ctx.do_not_alert {
            info!(
                key = %key,
                window_minutes = message.event.window_minutes,
                pct = %message.event.pct_change,
                "dry run, not alerting: {}",
                message.summary()
            );
            return;
        }

        match self.ctx.lock.try_acquire(key, self.settings.cooldown()).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(key = %key, window_minutes = message.event.window_minutes, "suppressed by cooldown");
                report.alerts_suppressed += 1;
                return;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "lock unavailable, skipping alert");
                return;
            }
        }

        match self.ctx.dispatcher.dispatch(&message).await {
            Ok(()) => {
                info!(key = %key, title = %message.title(), "alert dispatched");
                report.alerts_dispatched += 1;
            }
            Err(e) => {
                error!(key = %key, error = %e, "alert dispatch failed");
                report.dispatch_failures += 1;
            }
        }

        if !self.ctx.throttle.is_zero() {
            tokio::time::sleep(self.ctx.throttle).await;
        }
    }
}
