//! Rate-budgeted scheduler
//!
//! A bounded timeline of slots is refilled by a loader and drained by a
//! dispatcher, each on its own interval. Failed sends are re-placed with
//! jittered backoff and feed an AIMD throttle. The lifecycle controller
//! owns the tasks and resolves a single completion signal.

mod config;
mod core;
mod dispatcher;
mod loader;
mod messages;
pub mod retry;
mod state;
pub mod throttle;
mod timeline;

pub use config::PrompterConfig;
pub use core::{Completion, Prompter};
pub use messages::LifecycleEvent;
pub use retry::{MAX_RETRIES, RetryOutcome};
pub use state::{Phase, PrompterStats, RunState, SchedulerState};
pub use throttle::Throttle;
pub use timeline::{Timeline, TimelineError};
