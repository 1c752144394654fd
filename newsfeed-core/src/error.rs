use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("no news item with id {0}")]
    NotFound(u64),
    #[error("detail fetch for item {id} failed: {reason}")]
    FetchFailed { id: u64, reason: String },
    #[error("feed source stopped producing items")]
    ProducerExhausted,
    #[error("feed store has been shut down")]
    Stopped,
    #[error("feed task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}
