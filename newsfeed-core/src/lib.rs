pub mod config;
pub mod error;
pub mod feed;
pub mod source;
pub mod store;

pub use config::SourceConfig;
pub use error::{ConfigError, FeedError};
pub use feed::{Category, FeedState, FeedStatus, NewsItem};
pub use source::{FeedSource, SyntheticSource};
pub use store::{DetailRequest, FeedObserver, FeedStore};
