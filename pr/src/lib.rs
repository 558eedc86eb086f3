//! Prompter - rate-budgeted dispatcher for LLM generation work
//!
//! Prompter pulls work items from a paginated store and hands them to a
//! runner no faster than a per-minute budget allows. Recoverable failures are
//! retried with jittered backoff on a bounded timeline, and an AIMD throttle
//! slows the cadence further while the service is struggling.
//!
//! # Modules
//!
//! - [`scheduler`] - Timeline, loader, dispatcher, throttle, retry and lifecycle
//! - [`store`] - Store trait and the JSONL file store
//! - [`runner`] - Runner trait, failure classification and the Anthropic runner
//! - [`domain`] - Work items and the model budget
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use config::{Config, LlmConfig, StoreConfig};
pub use domain::{ModelBudget, WorkItem};
pub use error::PrompterError;
pub use runner::{AnthropicRunner, FailureKind, Runner, RunnerError};
pub use scheduler::{Completion, Phase, Prompter, PrompterConfig, PrompterStats, RetryOutcome, Timeline};
pub use store::{JsonlStore, LoadPage, Store, StoreError};
