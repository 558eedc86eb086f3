//! Lifecycle controller
//!
//! `Prompter` owns the shared scheduler state and every periodic task. A
//! supervisor task receives lifecycle events, sequences
//! Running → Draining → Completed, and resolves the completion signal once.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;

use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::config::PrompterConfig;
use super::dispatcher::Dispatcher;
use super::loader::Loader;
use super::messages::LifecycleEvent;
use super::state::{Phase, PrompterStats, SchedulerState};
use crate::domain::ModelBudget;
use crate::error::PrompterError;
use crate::runner::Runner;
use crate::store::Store;

/// Everything a periodic task needs, cheap to clone
#[derive(Clone)]
pub(crate) struct Context {
    pub budget: ModelBudget,
    pub config: PrompterConfig,
    pub state: Arc<Mutex<SchedulerState>>,
    pub store: Arc<dyn Store>,
    pub runner: Arc<dyn Runner>,
    pub events: mpsc::Sender<LifecycleEvent>,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(
        budget: ModelBudget,
        config: PrompterConfig,
        store: Arc<dyn Store>,
        runner: Arc<dyn Runner>,
    ) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (events, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let ctx = Self {
            state: Arc::new(Mutex::new(SchedulerState::new(&budget))),
            budget,
            config,
            store,
            runner,
            events,
            cancel: CancellationToken::new(),
        };
        (ctx, events_rx)
    }

    /// Stop all activity: cancel in-flight calls, then tell the supervisor
    ///
    /// The token is cancelled before the event is queued so that no tick can
    /// start new work while the supervisor catches up.
    pub async fn abort(&self, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(%reason, "Context::abort: called");
        self.cancel.cancel();
        let _ = self.events.send(LifecycleEvent::Abort { reason }).await;
    }

    pub async fn notify(&self, event: LifecycleEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Context::notify: supervisor gone");
        }
    }
}

/// Periodic task handles, aborted on every exit path
#[derive(Default)]
struct TaskSet {
    loader: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    drain: Option<JoinHandle<()>>,
}

impl TaskSet {
    fn stop_loader(&mut self) {
        if let Some(handle) = self.loader.take() {
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        for handle in [self.loader.take(), self.dispatcher.take(), self.drain.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Single-fire completion signal: `true` after a full drain, `false` on abort
pub struct Completion {
    rx: oneshot::Receiver<bool>,
}

impl Completion {
    pub async fn wait(self) -> bool {
        self.await
    }
}

impl Future for Completion {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<bool> {
        // A dropped sender means the supervisor died without finishing
        Pin::new(&mut self.rx).poll(cx).map(|r| r.unwrap_or(false))
    }
}

/// Rate-budgeted dispatcher of store items to a runner
pub struct Prompter {
    ctx: Context,
    events_rx: Mutex<Option<mpsc::Receiver<LifecycleEvent>>>,
}

impl Prompter {
    /// Create an idle Prompter
    pub fn new(
        budget: ModelBudget,
        config: PrompterConfig,
        store: Arc<dyn Store>,
        runner: Arc<dyn Runner>,
    ) -> Result<Self, PrompterError> {
        debug!(?budget, ?config, "Prompter::new: called");
        budget.validate()?;
        let (ctx, events_rx) = Context::new(budget, config, store, runner);
        Ok(Self {
            ctx,
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    pub fn budget(&self) -> &ModelBudget {
        &self.ctx.budget
    }

    /// Launch the loader and dispatcher; Idle → Running
    pub async fn start(&self) -> Result<Completion, PrompterError> {
        debug!("Prompter::start: called");
        let events_rx = self.events_rx.lock().await.take().ok_or(PrompterError::AlreadyStarted)?;

        self.ctx.state.lock().await.run.phase = Phase::Running;
        info!(
            rpm = self.ctx.budget.rpm,
            capacity = self.ctx.budget.capacity(),
            batch = self.ctx.budget.load_batch_size(),
            "Prompter starting"
        );

        let tasks = TaskSet {
            loader: Some(tokio::spawn(Loader::new(self.ctx.clone()).run())),
            dispatcher: Some(tokio::spawn(Dispatcher::new(self.ctx.clone()).run())),
            drain: None,
        };

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(supervise(self.ctx.clone(), tasks, events_rx, done_tx));

        Ok(Completion { rx: done_rx })
    }

    /// Abort a running Prompter from outside
    pub async fn abort(&self, reason: impl Into<String>) {
        let phase = self.phase().await;
        if !phase.is_active() {
            debug!(%phase, "Prompter::abort: not running, ignoring");
            return;
        }
        self.ctx.abort(reason).await;
    }

    pub async fn phase(&self) -> Phase {
        self.ctx.state.lock().await.run.phase
    }

    pub async fn stats(&self) -> PrompterStats {
        self.ctx.state.lock().await.stats.clone()
    }

    /// Id of the last item placed from the store
    pub async fn cursor(&self) -> u64 {
        self.ctx.state.lock().await.run.cursor
    }

    pub async fn in_flight(&self) -> usize {
        self.ctx.state.lock().await.run.in_flight
    }

    /// Occupied timeline slots
    pub async fn pending(&self) -> usize {
        self.ctx.state.lock().await.timeline.occupied()
    }
}

/// Poll until nothing is queued or in flight, then report `Drained`
async fn drain_poll(ctx: Context) {
    debug!("drain_poll: started");
    let mut interval = tokio::time::interval(ctx.config.drain_poll_interval());
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            _ = interval.tick() => {
                let quiescent = ctx.state.lock().await.is_quiescent();
                if quiescent {
                    debug!("drain_poll: quiescent");
                    ctx.notify(LifecycleEvent::Drained).await;
                    break;
                }
            }
        }
    }
}

/// Supervisor loop: the only place phases change after start
async fn supervise(
    ctx: Context,
    mut tasks: TaskSet,
    mut events: mpsc::Receiver<LifecycleEvent>,
    done_tx: oneshot::Sender<bool>,
) {
    let success = loop {
        let Some(event) = events.recv().await else {
            error!("Lifecycle channel closed unexpectedly");
            break false;
        };
        debug!(?event, "supervise: event");

        match event {
            LifecycleEvent::StoreExhausted => {
                let mut state = ctx.state.lock().await;
                if state.run.phase != Phase::Running {
                    continue;
                }
                state.run.phase = Phase::Draining;
                drop(state);

                tasks.stop_loader();
                tasks.drain = Some(tokio::spawn(drain_poll(ctx.clone())));
                info!("Store exhausted, draining");
            }
            LifecycleEvent::Drained => {
                info!("Drained, run complete");
                break true;
            }
            LifecycleEvent::Abort { reason } => {
                error!(%reason, "Aborting run");
                break false;
            }
        }
    };

    if !success {
        ctx.cancel.cancel();
    }
    tasks.abort_all();

    let mut state = ctx.state.lock().await;
    state.run.phase = Phase::Completed { success };
    info!(stats = ?state.stats, "Prompter finished");
    drop(state);

    let _ = done_tx.send(success);
}
