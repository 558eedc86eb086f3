//! Lifecycle events sent to the supervisor

/// Events reported by the periodic tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The store answered `done`; loading has stopped
    StoreExhausted,

    /// Nothing is in flight and nothing is left on the timeline
    Drained,

    /// An unrecoverable condition; the run must stop
    Abort { reason: String },
}
