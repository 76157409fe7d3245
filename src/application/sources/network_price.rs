//! RUNE/TOR price ratios reported by the network endpoint

use async_trait::async_trait;
use std::sync::Arc;

use super::{explorer_url, parse_or_skip, token_image, RUNE_ASSET};
use crate::application::monitor_job::ReadingSource;
use crate::domain::monitor::{AlertContext, MonitorKind, Reading};
use crate::infrastructure::thornode::ChainDataSource;
use crate::shared::errors::FetchError;
use crate::shared::types::MetricKey;

const VTHOR_ASSET: &str = "ETH.VTHOR-0x815c23eca83261b6ec689b60cc4a58b54bc24d8d";

/// Network fields and their fixed-point decimals.
const FIELDS: [(&str, u32); 2] = [("rune_price_in_tor", 8), ("tor_price_in_rune", 6)];

pub struct NetworkPriceSource {
    chain: Arc<dyn ChainDataSource>,
}

impl NetworkPriceSource {
    pub fn new(chain: Arc<dyn ChainDataSource>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ReadingSource for NetworkPriceSource {
    fn kind(&self) -> MonitorKind {
        MonitorKind::NetworkPrice
    }

    async fn fetch(&self) -> Result<Vec<Reading>, FetchError> {
        let network = self.chain.network().await?;

        Ok(FIELDS
            .iter()
            .filter_map(|&(field, decimals)| {
                let value = parse_or_skip(self.kind(), field, network.field(field)?)?;
                let image_asset = if field.starts_with("tor") { VTHOR_ASSET } else { RUNE_ASSET };
                let context = AlertContext {
                    monitor: MonitorKind::NetworkPrice,
                    subject: field.to_string(),
                    detail: None,
                    decimals,
                    precision: 4,
                    url: Some(explorer_url(field)),
                    image_url: Some(token_image(image_asset)),
                };
                Some(Reading::new(MetricKey::price(field), value, context))
            })
            .collect())
    }
}
