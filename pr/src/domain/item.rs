//! Work items pulled from the store and dispatched to the runner

use serde::{Deserialize, Serialize};

/// A single generation request
///
/// The `id` doubles as the store's pagination cursor, so stores must hand
/// items out in ascending id order. `retries` is only ever touched by the
/// retry scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,

    /// System prompt text
    #[serde(default)]
    pub system: String,

    /// User message text
    pub user: String,

    /// Number of times this item has been re-placed after a retryable failure
    #[serde(default)]
    pub retries: u32,
}

impl WorkItem {
    /// Create a fresh item with no retries
    pub fn new(id: u64, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id,
            system: system.into(),
            user: user.into(),
            retries: 0,
        }
    }

    /// Builder-style override of the retry count
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}
