//! Model rate budget and the pacing constants derived from it

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PrompterError;

const MINUTE: Duration = Duration::from_secs(60);

/// Per-model request budget
///
/// `rpm` is the only value the scheduler reads. `name` and `max_tokens` are
/// forwarded to the runner untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelBudget {
    /// Model identifier passed through to the runner
    pub name: String,

    /// Requests per minute
    pub rpm: u32,

    /// Token ceiling passed through to the runner
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,
}

impl Default for ModelBudget {
    fn default() -> Self {
        Self {
            name: "claude-sonnet-4-20250514".to_string(),
            rpm: 50,
            max_tokens: 4096,
        }
    }
}

impl ModelBudget {
    pub fn new(name: impl Into<String>, rpm: u32, max_tokens: u32) -> Self {
        Self {
            name: name.into(),
            rpm,
            max_tokens,
        }
    }

    /// Reject budgets the scheduler cannot pace
    pub fn validate(&self) -> Result<(), PrompterError> {
        if self.rpm == 0 {
            return Err(PrompterError::InvalidBudget("rpm must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Dispatcher period: one tick per unit of budget
    pub fn tick_duration(&self) -> Duration {
        MINUTE / self.rpm.max(1)
    }

    /// Timeline length: two minutes of ticks
    pub fn capacity(&self) -> usize {
        2 * self.rpm as usize
    }

    /// Items requested from the store per load
    ///
    /// Budgets under 4 rpm would round to zero, so the batch never drops below one.
    pub fn load_batch_size(&self) -> usize {
        ((self.rpm / 4) as usize).max(1)
    }

    /// Occupied-slot count at or above which the loader holds off
    pub fn load_threshold(&self) -> usize {
        self.load_batch_size().div_ceil(2)
    }

    /// Loader period
    pub fn load_period(&self) -> Duration {
        MINUTE / self.load_batch_size() as u32
    }
}
