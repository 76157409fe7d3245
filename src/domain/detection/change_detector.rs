//! Compares a current reading against its history at several lookback windows

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{evaluate_window, AlertEvent, DetectionRule, PriceLookup, Significance};
use crate::domain::snapshot::SnapshotStore;
use crate::shared::types::{Amount, MetricKey, TimestampMs};

const MINUTE_MS: i64 = 60_000;

/// Result of one detection pass over all lookback windows of a reading.
#[derive(Debug, Default)]
pub struct Detection {
    /// Qualifying events, one per window, in window order.
    pub events: Vec<AlertEvent>,
    /// Windows that found a usable baseline snapshot.
    pub baselines: usize,
    /// Windows skipped because the store failed.
    pub store_errors: usize,
    /// Candidates dropped by the significance filter.
    pub insignificant: usize,
}

pub struct ChangeDetector {
    store: Arc<dyn SnapshotStore>,
    prices: Option<Arc<dyn PriceLookup>>,
}

impl ChangeDetector {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self { store, prices: None }
    }

    pub fn with_price_lookup(mut self, prices: Arc<dyn PriceLookup>) -> Self {
        self.prices = Some(prices);
        self
    }

    /// Run every lookback window of `rule` against `current`.
    ///
    /// Missing history and store failures skip the affected window only.
    /// `price_asset` names the asset whose USD price feeds the significance
    /// filter; it is looked up at most once per call.
    pub async fn detect(
        &self,
        key: &MetricKey,
        current: &Amount,
        price_asset: Option<&str>,
        rule: &DetectionRule,
        now: TimestampMs,
    ) -> Detection {
        let mut detection = Detection::default();
        let mut price: Option<Option<Amount>> = None;

        for &window in &rule.lookback_minutes {
            let Some(target) = i64::try_from(window)
                .ok()
                .and_then(|minutes| minutes.checked_mul(MINUTE_MS))
                .and_then(|offset| now.checked_sub(offset))
            else {
                warn!(key = %key, window_minutes = window, "lookback window out of range, skipping");
                continue;
            };
            let snapshot = match self.store.find_nearest(key, target, rule.margin).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    debug!(key = %key, window_minutes = window, "no baseline snapshot");
                    continue;
                }
                Err(e) => {
                    warn!(key = %key, window_minutes = window, error = %e, "baseline lookup failed, skipping window");
                    detection.store_errors += 1;
                    continue;
                }
            };
            detection.baselines += 1;

            let Some(event) = evaluate_window(
                &snapshot,
                current,
                window,
                rule.threshold_percent,
                rule.threshold_mode,
            ) else {
                continue;
            };

            if let Some(settings) = &rule.significance {
                if price.is_none() {
                    price = Some(self.lookup_price(price_asset).await);
                }
                let usd_price = price.as_ref().and_then(|p| p.as_ref());
                let significance = Significance::assess(&event.abs_change, usd_price, settings.floor_usd);

                if !settings.admits(&significance) {
                    match &significance {
                        Significance::BelowFloor { usd } => info!(
                            key = %key,
                            window_minutes = window,
                            pct = %event.pct_change,
                            usd_e8 = %usd,
                            floor_usd = settings.floor_usd,
                            "change below significance floor, skipping"
                        ),
                        _ => info!(
                            key = %key,
                            window_minutes = window,
                            pct = %event.pct_change,
                            asset = price_asset.unwrap_or("-"),
                            "no price for significance check, skipping"
                        ),
                    }
                    detection.insignificant += 1;
                    continue;
                }
            }

            debug!(
                key = %key,
                window_minutes = window,
                pct = %event.pct_change,
                historical = %event.historical,
                current = %event.current,
                "threshold crossed"
            );
            detection.events.push(event);
        }

        detection
    }

    async fn lookup_price(&self, asset: Option<&str>) -> Option<Amount> {
        let (Some(prices), Some(asset)) = (&self.prices, asset) else {
            return None;
        };
        match prices.usd_price(asset).await {
            Ok(price) => price,
            Err(e) => {
                warn!(asset, error = %e, "price lookup failed");
                None
            }
        }
    }
}
