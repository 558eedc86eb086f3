//! Top-level error types for Prompter

use thiserror::Error;

use crate::scheduler::TimelineError;
use crate::store::StoreError;

/// Errors surfaced by the Prompter library API
///
/// Runtime send failures never appear here: they are contained by the
/// scheduler and only reflected in the completion signal.
#[derive(Debug, Error)]
pub enum PrompterError {
    #[error("Invalid model budget: {0}")]
    InvalidBudget(String),

    #[error("Prompter already started")]
    AlreadyStarted,

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
