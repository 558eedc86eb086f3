//! Periodic timeline refill from the store

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::core::Context;
use super::messages::LifecycleEvent;

/// Result of one loader tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadTick {
    /// Timeline at or above the load threshold
    Backpressure,

    /// Placed this many items
    Loaded(usize),

    /// Store has nothing more
    Exhausted,

    /// Store failed; the run cannot continue
    Failed(String),
}

/// Refills the timeline at `load_period`, holding off while it is busy
pub(crate) struct Loader {
    ctx: Context,
}

impl Loader {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Tick until the store is exhausted, the store fails, or the run is cancelled
    pub async fn run(self) {
        let period = self.ctx.budget.load_period();
        debug!(?period, "Loader::run: started");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.ctx.cancel.cancelled() => {
                    debug!("Loader::run: cancelled");
                    break;
                }
                _ = interval.tick() => {
                    match self.tick().await {
                        LoadTick::Backpressure | LoadTick::Loaded(_) => {}
                        LoadTick::Exhausted => {
                            info!("Store exhausted");
                            self.ctx.notify(LifecycleEvent::StoreExhausted).await;
                            break;
                        }
                        LoadTick::Failed(reason) => {
                            self.ctx.abort(reason).await;
                            break;
                        }
                    }
                }
            }
        }
    }

    /// One load attempt
    pub async fn tick(&self) -> LoadTick {
        let batch = self.ctx.budget.load_batch_size();
        let threshold = self.ctx.budget.load_threshold();

        let cursor = {
            let state = self.ctx.state.lock().await;
            let occupied = state.timeline.occupied();
            if occupied >= threshold {
                debug!(occupied, threshold, "Loader::tick: backpressure, skipping");
                return LoadTick::Backpressure;
            }
            state.run.cursor
        };

        let page = match self.ctx.store.load(cursor, batch).await {
            Ok(page) => page,
            Err(e) => {
                warn!(cursor, error = %e, "Loader::tick: store load failed");
                return LoadTick::Failed(format!("store load failed: {}", e));
            }
        };

        if page.done {
            if !page.items.is_empty() {
                warn!(count = page.items.len(), "Loader::tick: done page carried items, ignoring them");
            }
            return LoadTick::Exhausted;
        }

        let mut state = self.ctx.state.lock().await;
        let mut placed = 0;
        for item in page.items {
            if item.id <= state.run.cursor {
                warn!(id = item.id, cursor = state.run.cursor, "Loader::tick: item at or before cursor, skipping");
                continue;
            }
            let Some(index) = state.timeline.first_free() else {
                // Cursor stays on the last placed item, so the rest is reloaded later
                warn!(id = item.id, "Loader::tick: timeline full, deferring rest of page");
                break;
            };
            let id = item.id;
            if let Err(e) = state.timeline.occupy(index, item) {
                warn!(id, index, error = %e, "Loader::tick: placement failed");
                break;
            }
            state.run.cursor = id;
            placed += 1;
        }

        state.stats.loaded += placed as u64;
        state.note_occupancy();
        debug!(placed, cursor = state.run.cursor, occupied = state.timeline.occupied(), "Loader::tick: loaded");
        LoadTick::Loaded(placed)
    }
}
