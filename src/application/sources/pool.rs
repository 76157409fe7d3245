//! Depth properties of every liquidity pool

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{explorer_url, parse_or_skip, token_image};
use crate::application::monitor_job::ReadingSource;
use crate::domain::monitor::{AlertContext, MonitorKind, Reading};
use crate::infrastructure::thornode::ChainDataSource;
use crate::shared::config::PoolPropertyConfig;
use crate::shared::errors::FetchError;
use crate::shared::types::MetricKey;

pub struct PoolSource {
    chain: Arc<dyn ChainDataSource>,
    properties: Vec<PoolPropertyConfig>,
}

impl PoolSource {
    pub fn new(chain: Arc<dyn ChainDataSource>, properties: Vec<PoolPropertyConfig>) -> Self {
        Self { chain, properties }
    }
}

#[async_trait]
impl ReadingSource for PoolSource {
    fn kind(&self) -> MonitorKind {
        MonitorKind::Pool
    }

    async fn fetch(&self) -> Result<Vec<Reading>, FetchError> {
        let pools = self.chain.pools().await?;
        if pools.is_empty() {
            return Err(FetchError::Empty("pools".into()));
        }

        let mut readings = Vec::with_capacity(pools.len() * self.properties.len());
        for pool in &pools {
            for property in &self.properties {
                let Some(raw) = pool.property(&property.name) else {
                    debug!(pool = %pool.asset, property = %property.name, "property not reported");
                    continue;
                };
                let Some(value) = parse_or_skip(self.kind(), &property.name, raw) else {
                    continue;
                };

                let context = AlertContext {
                    monitor: MonitorKind::Pool,
                    subject: pool.asset.clone(),
                    detail: Some(property.name.clone()),
                    decimals: 8,
                    precision: 0,
                    url: Some(explorer_url(&format!("pool/{}", pool.asset))),
                    image_url: Some(token_image(&pool.asset)),
                };
                let mut reading = Reading::new(MetricKey::pool_property(&pool.asset, &property.name), value, context);
                if let Some(threshold) = property.threshold_percent {
                    reading = reading.with_threshold(threshold);
                }
                if let Some(asset) = property.price_asset(&pool.asset) {
                    reading = reading.with_price_asset(asset);
                }
                readings.push(reading);
            }
        }

        Ok(readings)
    }
}
