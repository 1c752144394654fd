use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream};
use futures_util::{FutureExt, StreamExt};
use tracing::debug;

use crate::config::SourceConfig;
use crate::error::FeedError;
use crate::feed::{Category, NewsItem};

/// Where a store gets its items and details from.
pub trait FeedSource: Send + Sync + 'static {
    /// Lazy, possibly endless, stream of new items.
    fn produce_feed(&self) -> BoxStream<'static, NewsItem>;

    fn fetch_detail(&self, id: u64) -> BoxFuture<'static, Result<String, FeedError>>;
}

/// In-process source that invents news on a fixed cadence.
///
/// Ids come from a counter shared by every stream this source hands out, so
/// asking for a second feed continues the numbering instead of restarting it.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    config: SourceConfig,
    next_id: Arc<AtomicU64>,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(SourceConfig::default())
    }
}

fn synthesize(id: u64) -> NewsItem {
    let category = Category::random(&mut rand::thread_rng());
    NewsItem::new(
        id,
        format!("Breaking News #{id}"),
        category.as_str(),
        format!("This is a summary about {category} news. Tap to read more."),
    )
}

pub fn detail_text(id: u64) -> String {
    format!(
        "Full detailed content for news #{id}. This text was loaded from a simulated remote service."
    )
}

impl FeedSource for SyntheticSource {
    fn produce_feed(&self) -> BoxStream<'static, NewsItem> {
        let next_id = self.next_id.clone();
        let interval = self.config.emit_interval();

        // The flag marks the first element, which is emitted without waiting.
        stream::unfold(true, move |first| {
            let next_id = next_id.clone();
            async move {
                if !first {
                    tokio::time::sleep(interval).await;
                }
                let id = next_id.fetch_add(1, Ordering::Relaxed);
                let item = synthesize(id);
                debug!(id, category = %item.category, "synthetic item produced");
                Some((item, false))
            }
        })
        .boxed()
    }

    fn fetch_detail(&self, id: u64) -> BoxFuture<'static, Result<String, FeedError>> {
        let delay = self.config.detail_delay();
        async move {
            tokio::time::sleep(delay).await;
            Ok(detail_text(id))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_item_is_immediate_and_the_rest_are_spaced() {
        let source = SyntheticSource::default();
        let mut feed = source.produce_feed();

        let start = Instant::now();
        let first = feed.next().await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);

        let second = feed.next().await.unwrap();
        assert_eq!(second.id, 2);
        assert!(start.elapsed() >= Duration::from_millis(2000));

        let third = feed.next().await.unwrap();
        assert_eq!(third.id, 3);
        assert!(start.elapsed() >= Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn items_follow_the_template() {
        let source = SyntheticSource::default();
        let items: Vec<NewsItem> = source.produce_feed().take(8).collect().await;

        for item in &items {
            assert!(item.title.contains(&item.id.to_string()));
            let category = Category::from_label(&item.category).expect("enumerated category");
            assert!(item.summary.contains(category.as_str()));
            assert!(!item.is_detail_loaded);
            assert!(item.detail_content.is_empty());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn a_second_feed_continues_numbering() {
        let source = SyntheticSource::default();
        let first: Vec<u64> = source.produce_feed().take(2).map(|i| i.id).collect().await;
        let second: Vec<u64> = source.produce_feed().take(2).map(|i| i.id).collect().await;
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_detail_waits_then_references_id() {
        let source = SyntheticSource::default();
        let start = Instant::now();
        let detail = source.fetch_detail(17).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(detail.contains("17"));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_fetches_do_not_interfere() {
        let source = SyntheticSource::default();
        let (a, b) = tokio::join!(source.fetch_detail(1), source.fetch_detail(2));
        assert_eq!(a.unwrap(), detail_text(1));
        assert_eq!(b.unwrap(), detail_text(2));
    }
}
