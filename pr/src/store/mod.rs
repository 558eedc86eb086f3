//! Work-item store collaborator
//!
//! The loader pages through a store by id cursor. The store also owns result
//! persistence, reached through the dispatcher's post-success hook.

mod jsonl;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::WorkItem;

pub use jsonl::JsonlStore;

/// Errors raised by store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record at line {line}: {message}")]
    InvalidRecord { line: usize, message: String },
}

/// One page of work from the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPage {
    /// The store has nothing after the cursor
    pub done: bool,

    /// Items in strictly ascending id order, all after the cursor
    pub items: Vec<WorkItem>,
}

impl LoadPage {
    /// A terminal page; carries no items
    pub fn done() -> Self {
        Self {
            done: true,
            items: Vec::new(),
        }
    }

    pub fn items(items: Vec<WorkItem>) -> Self {
        Self { done: false, items }
    }
}

/// Paginated source of work items
#[async_trait]
pub trait Store: Send + Sync {
    /// Load up to `limit` items with ids greater than `cursor`
    async fn load(&self, cursor: u64, limit: usize) -> Result<LoadPage, StoreError>;

    /// Persist the runner's output for a completed item
    async fn save(&self, item: &WorkItem, output: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing::debug;

    enum Source {
        /// Ids 1..=count, at most `page_size` per load
        Range { count: u64, page_size: usize },
        /// Pre-built pages in order, then done
        Pages(Mutex<VecDeque<LoadPage>>),
        Failing,
    }

    /// Mock store for unit tests
    pub struct MockStore {
        source: Source,
        load_calls: Mutex<Vec<(u64, usize)>>,
        saved: Mutex<Vec<(u64, String)>>,
    }

    impl MockStore {
        fn from_source(source: Source) -> Self {
            Self {
                source,
                load_calls: Mutex::new(Vec::new()),
                saved: Mutex::new(Vec::new()),
            }
        }

        pub fn with_items(count: u64, page_size: usize) -> Self {
            Self::from_source(Source::Range { count, page_size })
        }

        pub fn with_pages(pages: Vec<LoadPage>) -> Self {
            Self::from_source(Source::Pages(Mutex::new(pages.into())))
        }

        pub fn failing() -> Self {
            Self::from_source(Source::Failing)
        }

        pub fn load_calls(&self) -> Vec<(u64, usize)> {
            self.load_calls.lock().unwrap().clone()
        }

        pub fn saved(&self) -> Vec<(u64, String)> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Store for MockStore {
        async fn load(&self, cursor: u64, limit: usize) -> Result<LoadPage, StoreError> {
            debug!(cursor, limit, "MockStore::load: called");
            self.load_calls.lock().unwrap().push((cursor, limit));
            match &self.source {
                Source::Range { count, page_size } => {
                    let items: Vec<WorkItem> = (cursor + 1..=*count)
                        .take(limit.min(*page_size))
                        .map(|id| WorkItem::new(id, "system", format!("prompt {}", id)))
                        .collect();
                    if items.is_empty() {
                        Ok(LoadPage::done())
                    } else {
                        Ok(LoadPage::items(items))
                    }
                }
                Source::Pages(pages) => Ok(pages.lock().unwrap().pop_front().unwrap_or_else(LoadPage::done)),
                Source::Failing => Err(StoreError::Io(std::io::Error::other("store offline"))),
            }
        }

        async fn save(&self, item: &WorkItem, output: &str) -> Result<(), StoreError> {
            self.saved.lock().unwrap().push((item.id, output.to_string()));
            Ok(())
        }
    }
}
