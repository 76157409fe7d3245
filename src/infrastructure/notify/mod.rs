//! Alert dispatch channels

pub mod discord;
pub mod log;
pub mod message;

pub use discord::DiscordWebhook;
pub use log::LogDispatcher;
pub use message::AlertMessage;

use async_trait::async_trait;
use crate::shared::errors::DispatchError;

/// One-way, best-effort delivery of an alert.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, message: &AlertMessage) -> Result<(), DispatchError>;
}
