//! Execution contexts and the response transformer a request runs with.
//!
//! # Design
//! A request never spawns threads on its own. It is given two contexts at
//! construction: a background context that runs the transformer, and a
//! serialized delivery context on which every listener runs. Both are
//! traits so tests can substitute `ManualQueue`, which runs nothing until
//! asked and makes every interleaving reproducible.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::outcome::Outcome;

/// A unit of work handed to an execution context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Concurrent context used only for response transformation.
pub trait BackgroundContext: Send + Sync {
    fn spawn(&self, job: Job);
}

/// Serialized context used for all listener delivery.
///
/// Implementations must run jobs one at a time, in submission order.
pub trait DeliveryContext: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// Pure `Outcome -> Outcome` step applied to newly fetched outcomes.
pub trait ResponseTransformer: Send + Sync {
    fn transform(&self, outcome: Outcome) -> Outcome;
}

impl<F> ResponseTransformer for F
where
    F: Fn(Outcome) -> Outcome + Send + Sync,
{
    fn transform(&self, outcome: Outcome) -> Outcome {
        self(outcome)
    }
}

/// Transformer that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl ResponseTransformer for Identity {
    fn transform(&self, outcome: Outcome) -> Outcome {
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tokio-backed contexts
// ---------------------------------------------------------------------------

/// Runs transforms on tokio's blocking pool.
///
/// The join handle is dropped, so a panicking job is logged here.
#[derive(Debug, Clone)]
pub struct TokioBackground {
    handle: Handle,
}

impl TokioBackground {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl BackgroundContext for TokioBackground {
    fn spawn(&self, job: Job) {
        drop(self.handle.spawn_blocking(move || {
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                tracing::error!("background job panicked");
            }
        }));
    }
}

/// A single tokio task draining a FIFO of jobs.
///
/// A panicking job is logged and does not stop later deliveries.
#[derive(Debug, Clone)]
pub struct SerialQueue {
    sender: mpsc::UnboundedSender<Job>,
}

impl SerialQueue {
    pub fn new(handle: &Handle) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        handle.spawn(async move {
            while let Some(job) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("listener panicked during delivery");
                }
            }
        });
        Self { sender }
    }
}

impl DeliveryContext for SerialQueue {
    fn dispatch(&self, job: Job) {
        if self.sender.send(job).is_err() {
            tracing::error!("delivery queue is closed; dropping job");
        }
    }
}

// ---------------------------------------------------------------------------
// Deterministic context
// ---------------------------------------------------------------------------

/// Queue that only runs jobs when `run_pending` is called.
///
/// Serves as both background and delivery context.
#[derive(Default)]
pub struct ManualQueue {
    jobs: Mutex<VecDeque<Job>>,
}

impl ManualQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Run jobs until the queue is empty, including jobs queued by the jobs
    /// themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // The lock must be released before the job runs; jobs enqueue.
            let next = self.jobs.lock().pop_front();
            match next {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    fn push(&self, job: Job) {
        self.jobs.lock().push_back(job);
    }
}

impl BackgroundContext for ManualQueue {
    fn spawn(&self, job: Job) {
        self.push(job);
    }
}

impl DeliveryContext for ManualQueue {
    fn dispatch(&self, job: Job) {
        self.push(job);
    }
}

// ---------------------------------------------------------------------------
// Configuration bundle
// ---------------------------------------------------------------------------

/// Everything a request needs besides its transport.
#[derive(Clone)]
pub struct RequestContext {
    pub background: Arc<dyn BackgroundContext>,
    pub delivery: Arc<dyn DeliveryContext>,
    pub transformer: Arc<dyn ResponseTransformer>,
}

impl RequestContext {
    pub fn new(
        background: Arc<dyn BackgroundContext>,
        delivery: Arc<dyn DeliveryContext>,
    ) -> Self {
        Self {
            background,
            delivery,
            transformer: Arc::new(Identity),
        }
    }

    /// Blocking-pool transforms and a single serial delivery task on `handle`.
    pub fn tokio(handle: &Handle) -> Self {
        Self::new(
            Arc::new(TokioBackground::new(handle.clone())),
            Arc::new(SerialQueue::new(handle)),
        )
    }

    pub fn with_transformer(mut self, transformer: impl ResponseTransformer + 'static) -> Self {
        self.transformer = Arc::new(transformer);
        self
    }
}
