//! Generation runner collaborator
//!
//! The dispatcher hands each due item to a runner. Runners report failures
//! with a structured [`RunnerError`] whose [`FailureKind`] decides between
//! backoff and abort.

mod anthropic;
mod error;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::WorkItem;

pub use anthropic::AnthropicRunner;
pub use error::{FailureKind, RETRYABLE_STATUS, RunnerError};

/// Executes one generation request per work item
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run the item and return the generated text
    ///
    /// `cancel` fires once, on global abort. Implementations should unwind
    /// promptly when it does.
    async fn chat(&self, item: &WorkItem, cancel: CancellationToken) -> Result<String, RunnerError>;
}
