//! Log-only channel, used when no webhook is configured

use async_trait::async_trait;
use tracing::warn;

use super::{AlertDispatcher, AlertMessage};
use crate::shared::errors::DispatchError;

#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn dispatch(&self, message: &AlertMessage) -> Result<(), DispatchError> {
        warn!(
            key = %message.event.key,
            window_minutes = message.event.window_minutes,
            pct = %message.event.pct_change,
            "ALERT: {}",
            message.summary()
        );
        Ok(())
    }
}
