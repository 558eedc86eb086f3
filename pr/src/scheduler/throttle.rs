//! AIMD send-cadence throttle
//!
//! A second pacing layer under the static rpm cap. `step` rises slowly on
//! success and falls quickly on retryable failure; the lower it gets, the more
//! dispatcher ticks are suppressed between sends.

use tracing::debug;

/// Lowest step (heaviest throttling)
pub const STEP_MIN: f64 = 1.0;

/// Highest step (no throttling)
pub const STEP_MAX: f64 = 32.0;

/// Additive increase applied on every success
pub const STEP_INCREASE: f64 = 0.1;

/// Decrease applied on every retryable failure
pub const STEP_DECREASE: f64 = 0.5;

/// Throttle state consumed by the dispatcher
#[derive(Debug, Clone)]
pub struct Throttle {
    step: f64,
    /// Ticks elapsed since the last send; saturates
    ticks_since_send: u32,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new()
    }
}

impl Throttle {
    /// Start unthrottled
    pub fn new() -> Self {
        Self::with_step(STEP_MAX)
    }

    /// Start from an explicit step, clamped into range
    pub fn with_step(step: f64) -> Self {
        Self {
            step: step.clamp(STEP_MIN, STEP_MAX),
            ticks_since_send: u32::MAX,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Ticks per send: 1 at full health, up to 32 when fully backed off
    pub fn skip_count(&self) -> u32 {
        (STEP_MAX + STEP_MIN - self.step).round() as u32
    }

    pub fn is_throttling(&self) -> bool {
        self.skip_count() > 1
    }

    pub fn on_success(&mut self) {
        self.step = (self.step + STEP_INCREASE).min(STEP_MAX);
        debug!(step = self.step, "Throttle::on_success: step raised");
    }

    pub fn on_failure(&mut self) {
        self.step = (self.step - STEP_DECREASE).max(STEP_MIN);
        debug!(step = self.step, skip = self.skip_count(), "Throttle::on_failure: step lowered");
    }

    /// Whether the current tick may fire a send
    pub fn gate_open(&self) -> bool {
        self.ticks_since_send.saturating_add(1) >= self.skip_count()
    }

    /// Record the outcome of a dispatcher tick
    pub fn record_tick(&mut self, sent: bool) {
        if sent {
            self.ticks_since_send = 0;
        } else {
            self.ticks_since_send = self.ticks_since_send.saturating_add(1);
        }
    }
}
