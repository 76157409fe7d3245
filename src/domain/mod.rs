//! Domain layer - snapshot history, change detection and alert deduplication

pub mod clock;
pub mod detection;
pub mod lock;
pub mod monitor;
pub mod snapshot;
