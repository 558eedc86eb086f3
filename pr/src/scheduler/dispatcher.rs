//! Rate-paced dispatch of due items
//!
//! One tick per `60s / rpm`. Each tick pops the front slot and starts at most
//! one send, so the static cap holds no matter how full the timeline is. The
//! throttle can only thin sends out further.

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use super::core::Context;
use super::retry::{self, RetryOutcome};
use super::state::SchedulerState;
use crate::domain::WorkItem;
use crate::runner::{FailureKind, RunnerError};

/// Result of one dispatcher tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DispatchTick {
    /// Nothing was due
    Idle,

    /// A send was started for this item
    Sent(u64),

    /// The throttle held this item back to the next free slot
    Suppressed(u64),

    /// The run is over
    Stopped,
}

/// Pops the front slot every tick and starts sends
pub(crate) struct Dispatcher {
    ctx: Context,
}

impl Dispatcher {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub async fn run(self) {
        let period = self.ctx.budget.tick_duration();
        debug!(?period, "Dispatcher::run: started");
        let mut interval = tokio::time::interval(period);
        // Never burst to catch up: that would break the per-minute cap
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.ctx.cancel.cancelled() => {
                    debug!("Dispatcher::run: cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if self.tick().await == DispatchTick::Stopped {
                        break;
                    }
                }
            }
        }
    }

    /// Read slot 0, advance the timeline, and start a send if allowed
    pub async fn tick(&self) -> DispatchTick {
        let mut state = self.ctx.state.lock().await;
        if self.ctx.cancel.is_cancelled() || state.run.phase.is_terminal() {
            return DispatchTick::Stopped;
        }

        let Some(item) = state.timeline.advance() else {
            state.throttle.record_tick(false);
            return DispatchTick::Idle;
        };
        let id = item.id;

        if !state.throttle.gate_open() {
            state.throttle.record_tick(false);
            state.stats.suppressed += 1;
            defer(&mut state, item);
            return DispatchTick::Suppressed(id);
        }

        state.throttle.record_tick(true);
        state.run.in_flight += 1;
        state.stats.dispatched += 1;
        debug!(id, in_flight = state.run.in_flight, "Dispatcher::tick: sending");
        drop(state);

        tokio::spawn(send(self.ctx.clone(), item));
        DispatchTick::Sent(id)
    }
}

/// Put a throttled item back at the slot nearest "now"
///
/// After an advance the tail slot is free, so the only way to lose the item
/// is a timeline that was full before the pop.
fn defer(state: &mut SchedulerState, item: WorkItem) {
    let id = item.id;
    let skip = state.throttle.skip_count();
    let Some(index) = state.timeline.find_nearest_free(0) else {
        warn!(id, "defer: throttled with no free slot, dropping item");
        state.stats.dropped += 1;
        return;
    };
    match state.timeline.occupy(index, item) {
        Ok(()) => debug!(id, index, skip, "defer: throttled, deferred"),
        Err(e) => {
            warn!(id, index, error = %e, "defer: placement failed, dropping item");
            state.stats.dropped += 1;
        }
    }
}

/// Run one item through the runner and apply the outcome
pub(crate) async fn send(ctx: Context, item: WorkItem) {
    let id = item.id;
    let result = tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(RunnerError::Cancelled),
        result = ctx.runner.chat(&item, ctx.cancel.clone()) => result,
    };

    // Post-success hook, outside the lock
    let persist = ctx.config.persist_results && !ctx.cancel.is_cancelled();
    let saved = match &result {
        Ok(output) if persist => match ctx.store.save(&item, output).await {
            Ok(()) => Some(true),
            Err(e) => {
                warn!(id, error = %e, "send: failed to save result");
                Some(false)
            }
        },
        _ => None,
    };

    let mut state = ctx.state.lock().await;
    state.run.in_flight = state.run.in_flight.saturating_sub(1);

    if ctx.cancel.is_cancelled() {
        debug!(id, "send: run cancelled, discarding outcome");
        return;
    }

    match saved {
        Some(true) => state.stats.saved += 1,
        Some(false) => state.stats.save_failures += 1,
        None => {}
    }

    if let Some(reason) = apply_outcome(&ctx, &mut state, item, result) {
        drop(state);
        ctx.abort(reason).await;
    }
}

/// Fold one send outcome into the scheduler state
///
/// Returns the abort reason on a fatal failure. The token is cancelled here,
/// while the caller still holds the state lock, so no tick can start another
/// send before the supervisor hears about it.
fn apply_outcome(
    ctx: &Context,
    state: &mut SchedulerState,
    item: WorkItem,
    result: Result<String, RunnerError>,
) -> Option<String> {
    let id = item.id;
    let err = match result {
        Ok(_) => {
            state.throttle.on_success();
            state.stats.succeeded += 1;
            debug!(id, "apply_outcome: success");
            return None;
        }
        Err(e) => e,
    };

    match err.kind() {
        FailureKind::Retryable => {
            warn!(id, retries = item.retries, error = %err, "apply_outcome: retryable failure");
            state.throttle.on_failure();
            match retry::reschedule(&mut state.timeline, item, retry::sample_jitter()) {
                RetryOutcome::Placed { .. } => state.stats.retried += 1,
                RetryOutcome::Dropped { .. } => state.stats.dropped += 1,
                RetryOutcome::Exhausted { .. } => state.stats.exhausted += 1,
            }
            state.note_occupancy();
            None
        }
        FailureKind::Fatal => {
            error!(id, error = %err, "apply_outcome: fatal failure");
            ctx.cancel.cancel();
            Some(format!("item {} failed: {}", id, err))
        }
    }
}
