use std::future::Future;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::warn;

use super::error::{Phase, ReloaderError};
use super::lock::lock_recovering;
use super::profiled::PhaseTimer;
use super::progress::ProgressCounters;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted tasks somewhere, eventually.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task);
}

/// Tasks go to the runtime's blocking pool.
impl TaskExecutor for Handle {
    fn execute(&self, task: Task) {
        drop(self.spawn_blocking(task));
    }
}

/// Executor whose tasks run only when the owning thread drains its
/// [`TaskQueue`], e.g. a main loop that owns thread-affine state.
#[derive(Debug, Clone)]
pub struct QueuedExecutor {
    sender: mpsc::Sender<Task>,
}

#[derive(Debug)]
pub struct TaskQueue {
    receiver: Mutex<mpsc::Receiver<Task>>,
}

pub fn task_queue() -> (QueuedExecutor, TaskQueue) {
    let (sender, receiver) = mpsc::channel();
    (
        QueuedExecutor { sender },
        TaskQueue {
            receiver: Mutex::new(receiver),
        },
    )
}

impl TaskExecutor for QueuedExecutor {
    fn execute(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("queued_task_dropped_queue_closed");
        }
    }
}

impl TaskQueue {
    /// Runs every task queued so far on the calling thread. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0usize;
        loop {
            let next = lock_recovering(&self.receiver, "task_queue_receive").try_recv();
            match next {
                Ok(task) => {
                    task();
                    ran += 1;
                }
                Err(_) => return ran,
            }
        }
    }
}

/// Submission point for one phase of one reloader.
///
/// Every submitted task is counted as scheduled when submitted and as
/// completed when it returns; with profiling on, its run time is added to the
/// phase timer.
#[derive(Clone)]
pub struct PhaseExecutor {
    phase: Phase,
    executor: Arc<dyn TaskExecutor>,
    counters: Arc<ProgressCounters>,
    timer: Option<Arc<PhaseTimer>>,
}

impl PhaseExecutor {
    pub(crate) fn new(
        phase: Phase,
        executor: Arc<dyn TaskExecutor>,
        counters: Arc<ProgressCounters>,
    ) -> Self {
        Self {
            phase,
            executor,
            counters,
            timer: None,
        }
    }

    pub(crate) fn with_timer(mut self, timer: Arc<PhaseTimer>) -> Self {
        self.timer = Some(timer);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Fire-and-forget submission.
    pub fn execute<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.counters.schedule(self.phase);
        let counters = Arc::clone(&self.counters);
        let timer = self.timer.clone();
        let phase = self.phase;
        self.executor.execute(Box::new(move || {
            let started = Instant::now();
            work();
            if let Some(timer) = timer {
                timer.record(started.elapsed());
            }
            counters.complete(phase);
        }));
    }

    /// Submits `work` and resolves to its output. Fails with
    /// [`ReloaderError::TaskAbandoned`] if the task is dropped or panics.
    pub fn run<F, T>(&self, work: F) -> impl Future<Output = Result<T, ReloaderError>> + Send
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.execute(move || {
            let _ = tx.send(work());
        });
        let phase = self.phase;
        async move {
            rx.await
                .map_err(|_| ReloaderError::TaskAbandoned { phase })
        }
    }
}

impl std::fmt::Debug for PhaseExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseExecutor")
            .field("phase", &self.phase)
            .field("profiled", &self.timer.is_some())
            .finish_non_exhaustive()
    }
}
