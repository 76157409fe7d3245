//! Periodic execution of the monitor jobs
//!
//! Two cadences: the regular interval and, when configured, a fast interval
//! for monitors flagged `fast`. Jobs of one tick run concurrently and the
//! tick ends when all of them finished. A tick that overruns its interval
//! completes; the ticks it missed are skipped, not bunched.

use futures::future::{join3, join_all};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::monitor_job::{MonitorJob, TickReport};
use crate::domain::monitor::MonitorKind;
use crate::shared::config::ScheduleConfig;
use crate::shared::errors::JobError;

pub type TickOutcome = (MonitorKind, Result<TickReport, JobError>);

pub struct Scheduler {
    regular: Vec<MonitorJob>,
    fast: Vec<MonitorJob>,
    interval: Duration,
    fast_interval: Duration,
}

impl Scheduler {
    pub fn new(jobs: Vec<MonitorJob>, schedule: &ScheduleConfig) -> Self {
        let interval = Duration::from_secs(schedule.interval_secs);
        let (fast, regular): (Vec<_>, Vec<_>) = match schedule.fast_interval_secs {
            Some(_) => jobs.into_iter().partition(|job| job.settings().fast),
            None => (Vec::new(), jobs),
        };

        Self {
            regular,
            fast,
            interval,
            fast_interval: schedule.fast_interval_secs.map(Duration::from_secs).unwrap_or(interval),
        }
    }

    pub fn job_count(&self) -> usize {
        self.regular.len() + self.fast.len()
    }

    /// One tick of every job regardless of cadence.
    pub async fn run_once(&self) -> Vec<TickOutcome> {
        let jobs: Vec<&MonitorJob> = self.regular.iter().chain(self.fast.iter()).collect();
        run_jobs("once", &jobs).await
    }

    /// Run until `shutdown` resolves. Ticks in flight are allowed to finish.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        if self.job_count() == 0 {
            warn!("no monitors enabled");
        }
        info!(
            regular = self.regular.len(),
            fast = self.fast.len(),
            interval_secs = self.interval.as_secs(),
            fast_interval_secs = self.fast_interval.as_secs(),
            "scheduler started"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let signal = async move {
            shutdown.await;
            info!("shutdown requested, finishing current ticks");
            let _ = stop_tx.send(true);
        };

        join3(
            signal,
            drive("regular", &self.regular, self.interval, stop_rx.clone()),
            drive("fast", &self.fast, self.fast_interval, stop_rx),
        )
        .await;
        info!("scheduler stopped");
    }
}

async fn drive(schedule: &'static str, jobs: &[MonitorJob], period: Duration, mut stop: watch::Receiver<bool>) {
    if jobs.is_empty() {
        return;
    }
    let jobs: Vec<&MonitorJob> = jobs.iter().collect();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                run_jobs(schedule, &jobs).await;
            }
        }
    }
}

async fn run_jobs(schedule: &'static str, jobs: &[&MonitorJob]) -> Vec<TickOutcome> {
    let span = info_span!("tick", schedule, tick_id = %Uuid::new_v4());
    async {
        let outcomes: Vec<TickOutcome> = join_all(jobs.iter().map(|job| async move {
            (job.kind(), job.run_tick().await)
        }))
        .await;

        for (kind, outcome) in &outcomes {
            match outcome {
                Ok(report) => info!(
                    monitor = %kind,
                    readings = report.readings,
                    detected = report.alerts_detected,
                    dispatched = report.alerts_dispatched,
                    suppressed = report.alerts_suppressed,
                    dispatch_failures = report.dispatch_failures,
                    store_failures = report.store_failures,
                    "monitor tick complete"
                ),
                Err(e) => error!(monitor = %kind, error = %e, "monitor tick failed"),
            }
        }
        outcomes
    }
    .instrument(span)
    .await
}
