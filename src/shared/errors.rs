//! Error handling for the application

use thiserror::Error;

/// Snapshot store and lock backend errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store backend unavailable: {0}")]
    Unavailable(String),

    #[error("Store command failed: {0}")]
    CommandFailed(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() || err.is_timeout() {
            StoreError::Unavailable(err.to_string())
        } else {
            StoreError::CommandFailed(err.to_string())
        }
    }
}

/// Upstream data source errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid numeric field {field}: {value}")]
    InvalidAmount { field: String, value: String },

    #[error("No data fetched: {0}")]
    Empty(String),
}

/// Alert dispatch errors
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Webhook URL not configured")]
    MissingWebhook,

    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected message with status {0}")]
    Rejected(u16),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration for {section}: {reason}")]
    Invalid { section: String, reason: String },
}

impl ConfigError {
    pub fn invalid(section: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

/// Monitor job errors, surfaced once per tick
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Fetch failed for {monitor}: {source}")]
    Fetch {
        monitor: String,
        #[source]
        source: FetchError,
    },

    #[error("Store unreachable for the whole {monitor} tick: {source}")]
    StoreUnavailable {
        monitor: String,
        #[source]
        source: StoreError,
    },
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Upstream error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Alert channel error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Unknown monitor: {0}")]
    UnknownMonitor(String),
}
