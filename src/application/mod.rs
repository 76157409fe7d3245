//! Application layer - monitor jobs, reading sources, scheduling and CLI

pub mod commands;
pub mod monitor_job;
pub mod scheduler;
pub mod sources;

pub use commands::{Cli, CommandExecutor, Commands};
pub use monitor_job::{JobContext, MonitorJob, ReadingSource, TickReport};
pub use scheduler::Scheduler;
