//! Detection domain - windowed change detection over snapshot history

mod change_detector;
mod significance;

pub use change_detector::{ChangeDetector, Detection};
pub use significance::{usd_value, PriceLookup, Significance, StorePriceLookup, USD_DECIMALS};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use std::time::Duration;

use crate::domain::monitor::{SignificanceSettings, ThresholdMode};
use crate::shared::types::{Amount, MetricKey, Snapshot, TimestampMs};

/// Everything the detector needs to judge one series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionRule {
    /// Lookback horizons in minutes, compared in this order.
    pub lookback_minutes: Vec<u64>,
    pub margin: Duration,
    pub threshold_percent: u64,
    pub threshold_mode: ThresholdMode,
    pub significance: Option<SignificanceSettings>,
}

impl DetectionRule {
    /// Same rule with a per-entity threshold, e.g. a wallet's own percentage.
    pub fn with_threshold(&self, threshold_percent: u64) -> Self {
        Self {
            threshold_percent,
            ..self.clone()
        }
    }
}

/// A threshold crossing for one lookback window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub key: MetricKey,
    pub window_minutes: u64,
    pub historical_timestamp: TimestampMs,
    pub historical: Amount,
    pub current: Amount,
    /// `|current - historical| * 100 / historical`, truncated.
    pub pct_change: BigInt,
    pub abs_change: BigInt,
}

impl AlertEvent {
    /// Signed change, negative for decreases.
    pub fn delta(&self) -> BigInt {
        &self.current - &self.historical
    }
}

/// Truncated percentage change relative to `historical`.
///
/// `None` when `historical` is zero or negative: there is no meaningful
/// relative change against such a baseline.
pub fn pct_change(historical: &Amount, current: &Amount) -> Option<BigInt> {
    if !historical.is_positive() {
        return None;
    }
    let abs_diff = (current - historical).abs();
    Some(abs_diff * 100u32 / historical)
}

/// Compare `current` against one historical snapshot.
pub fn evaluate_window(
    snapshot: &Snapshot,
    current: &Amount,
    window_minutes: u64,
    threshold_percent: u64,
    mode: ThresholdMode,
) -> Option<AlertEvent> {
    let pct = pct_change(&snapshot.value, current)?;
    let abs_change = (current - &snapshot.value).abs();
    if abs_change.is_zero() || !mode.crossed(&pct, threshold_percent) {
        return None;
    }

    Some(AlertEvent {
        key: snapshot.key.clone(),
        window_minutes,
        historical_timestamp: snapshot.timestamp,
        historical: snapshot.value.clone(),
        current: current.clone(),
        pct_change: pct,
        abs_change,
    })
}
