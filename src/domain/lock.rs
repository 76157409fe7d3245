//! Notification deduplication lock contract

use async_trait::async_trait;
use std::time::Duration;

use crate::shared::errors::StoreError;
use crate::shared::types::MetricKey;

/// Short-lived per-key flag meaning "an alert for this key was just sent".
///
/// There is no release: a lock lives for exactly its cooldown.
#[async_trait]
pub trait NotificationLock: Send + Sync {
    /// Atomically take the lock for `key` if it is free.
    ///
    /// Returns `true` when the caller may alert, `false` while an earlier
    /// lock for the same key is still inside its cooldown.
    async fn try_acquire(&self, key: &MetricKey, cooldown: Duration) -> Result<bool, StoreError>;
}
