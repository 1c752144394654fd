use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Technology,
    Sports,
    Politics,
    Entertainment,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Technology,
        Category::Sports,
        Category::Politics,
        Category::Entertainment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Sports => "Sports",
            Category::Politics => "Politics",
            Category::Entertainment => "Entertainment",
        }
    }

    /// Uniform pick over [`Category::ALL`].
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Matches a stored (upper-cased) category back to the enumerated set.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub summary: String,
    pub is_detail_loaded: bool,
    pub detail_content: String,
    pub received_at: DateTime<Utc>,
}

impl NewsItem {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        category: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            summary: summary.into(),
            is_detail_loaded: false,
            detail_content: String::new(),
            received_at: Utc::now(),
        }
    }

    /// Upper-cases the category. Applying it twice changes nothing.
    pub fn normalized(mut self) -> Self {
        self.category = self.category.to_uppercase();
        self
    }

    fn with_detail(&self, content: String) -> Self {
        Self {
            is_detail_loaded: true,
            detail_content: content,
            ..self.clone()
        }
    }
}

/// Lifecycle of the ingestion side of a store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    Idle,
    Live,
    Exhausted,
    Stopped,
}

impl FeedStatus {
    pub fn accepts_items(&self) -> bool {
        matches!(self, FeedStatus::Idle | FeedStatus::Live)
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeedStatus::Idle => "idle",
            FeedStatus::Live => "live",
            FeedStatus::Exhausted => "exhausted",
            FeedStatus::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

/// Snapshot published to observers. Every transition builds a new value
/// from the previous one; a published snapshot is never edited in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedState {
    /// Newest first, in arrival order.
    pub items: Vec<NewsItem>,
    /// Completed detail requests, duplicates included.
    pub read_count: u64,
    pub status: FeedStatus,
}

impl FeedState {
    pub fn get(&self, id: u64) -> Option<&NewsItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_detail_loaded).count()
    }

    pub fn with_item(&self, item: NewsItem) -> Self {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.push(item);
        items.extend(self.items.iter().cloned());
        Self {
            items,
            read_count: self.read_count,
            status: self.status,
        }
    }

    /// Returns `None` when `id` is not present.
    pub fn with_detail(&self, id: u64, content: String) -> Option<Self> {
        let position = self.items.iter().position(|item| item.id == id)?;
        let mut items = self.items.clone();
        items[position] = items[position].with_detail(content);
        Some(Self {
            items,
            read_count: self.read_count + 1,
            status: self.status,
        })
    }

    pub fn with_status(&self, status: FeedStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}
