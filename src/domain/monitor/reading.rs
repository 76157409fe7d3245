//! Current readings produced by a monitor's data source

use crate::shared::types::{Amount, MetricKey};
use super::MonitorKind;

/// Presentation data carried alongside a reading so the dispatcher can
/// render an alert without knowing which monitor produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertContext {
    pub monitor: MonitorKind,
    /// Asset, price series or denom the reading is about.
    pub subject: String,
    /// Pool property name or wallet nickname.
    pub detail: Option<String>,
    /// Fixed-point decimals of the value.
    pub decimals: u32,
    /// Fractional digits shown in messages.
    pub precision: u32,
    pub url: Option<String>,
    pub image_url: Option<String>,
}

/// One freshly fetched value for a metric key.
#[derive(Debug, Clone)]
pub struct Reading {
    pub key: MetricKey,
    pub value: Amount,
    /// Overrides the monitor's threshold for this entity.
    pub threshold_percent: Option<u64>,
    /// Asset whose USD price converts this reading for the significance floor.
    pub price_asset: Option<String>,
    pub context: AlertContext,
}

impl Reading {
    pub fn new(key: MetricKey, value: Amount, context: AlertContext) -> Self {
        Self {
            key,
            value,
            threshold_percent: None,
            price_asset: None,
            context,
        }
    }

    pub fn with_threshold(mut self, threshold_percent: u64) -> Self {
        self.threshold_percent = Some(threshold_percent);
        self
    }

    pub fn with_price_asset(mut self, asset: impl Into<String>) -> Self {
        self.price_asset = Some(asset.into());
        self
    }
}
