//! Backoff placement for retryable send failures
//!
//! A failed item goes back on the timeline at a jittered, super-linear
//! distance from "now", using the nearest free slot around that position.

use rand::Rng;
use tracing::{debug, warn};

use super::timeline::Timeline;
use crate::domain::WorkItem;

/// Retry ceiling; an item that already failed this many times is dropped
pub const MAX_RETRIES: u32 = 10;

/// Exponent applied to the attempt number
pub const BACKOFF_EXPONENT: f64 = 1.85;

/// Jitter multiplier range, `[low, high)`
pub const JITTER_RANGE: std::ops::Range<f64> = 0.75..1.0;

/// What happened to a retryable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Re-placed at `index` with its retry count bumped to `retries`
    Placed { id: u64, index: usize, retries: u32 },

    /// Timeline had no free slot; the item is gone
    Dropped { id: u64 },

    /// The item had already used every retry
    Exhausted { id: u64 },
}

/// Draw a jitter multiplier from `JITTER_RANGE`
pub fn sample_jitter() -> f64 {
    rand::rng().random_range(JITTER_RANGE)
}

/// Timeline index for the next attempt of an item that has failed `retries` times
///
/// `floor((retries + 1)^1.85 × jitter)`, capped at the last slot.
pub fn backoff_index(retries: u32, jitter: f64, capacity: usize) -> usize {
    let delay = (f64::from(retries + 1).powf(BACKOFF_EXPONENT) * jitter).floor() as usize;
    delay.min(capacity.saturating_sub(1))
}

/// Put a retryable item back on the timeline
pub fn reschedule(timeline: &mut Timeline, mut item: WorkItem, jitter: f64) -> RetryOutcome {
    let id = item.id;
    if item.retries >= MAX_RETRIES {
        warn!(id, retries = item.retries, "reschedule: retries exhausted, dropping item");
        return RetryOutcome::Exhausted { id };
    }

    let target = backoff_index(item.retries, jitter, timeline.capacity());
    let Some(index) = timeline.find_nearest_free(target) else {
        warn!(id, target, "reschedule: timeline full, dropping item");
        return RetryOutcome::Dropped { id };
    };

    item.retries += 1;
    let retries = item.retries;
    match timeline.occupy(index, item) {
        Ok(()) => {
            debug!(id, target, index, retries, "reschedule: placed");
            RetryOutcome::Placed { id, index, retries }
        }
        Err(e) => {
            // find_nearest_free only returns empty in-range slots
            warn!(id, index, error = %e, "reschedule: placement failed, dropping item");
            RetryOutcome::Dropped { id }
        }
    }
}
