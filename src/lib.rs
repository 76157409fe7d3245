//! Thorwatch - THORChain balance and price watcher
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

// Re-export main types for convenience
pub use application::{MonitorJob, Scheduler};
pub use domain::detection::ChangeDetector;
pub use domain::lock::NotificationLock;
pub use domain::snapshot::SnapshotStore;
