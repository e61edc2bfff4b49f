use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::resource::ResourceManager;

use super::barrier::{Barrier, BarrierHandle};
use super::error::{Phase, ReloadError, ReloaderError};
use super::executor::{PhaseExecutor, TaskExecutor};
use super::handle::{ReloadHandle, ReloadState};
use super::profiled::{ProfilingDecorator, ReloaderProfile};
use super::progress::ProgressCounters;
use super::reloader::{ReloadContext, Reloader};

pub type ReloadFuture<T> = Pin<Box<dyn Future<Output = Result<T, ReloaderError>> + Send + 'static>>;

/// How each reloader is invoked and how the cycle's results are summarised.
pub trait ReloadStrategy: Send + Sync + 'static {
    type Output: Send + 'static;

    fn invoke(&self, reloader: Arc<dyn Reloader>, ctx: ReloadContext) -> ReloadFuture<Self::Output>;

    /// Called once, with outputs in reloader order, after every reloader succeeded.
    fn finish(&self, outputs: Vec<Self::Output>, elapsed: Duration) -> Vec<ReloaderProfile>;
}

/// Invokes reloaders as-is.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainReload;

impl ReloadStrategy for PlainReload {
    type Output = ();

    fn invoke(&self, reloader: Arc<dyn Reloader>, ctx: ReloadContext) -> ReloadFuture<()> {
        Box::pin(async move { reloader.reload(ctx).await })
    }

    fn finish(&self, outputs: Vec<()>, elapsed: Duration) -> Vec<ReloaderProfile> {
        debug!(
            reloader_count = outputs.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "resource_reload_finished"
        );
        Vec::new()
    }
}

struct ReloaderOutcome<T> {
    slot: usize,
    result: Result<T, ReloadError>,
}

/// Drives reloaders through prepare, barrier and apply.
///
/// Coordination futures run on `driver`; reloader work runs on the prepare
/// and apply executors, which may be the same pool.
#[derive(Clone)]
pub struct ReloadOrchestrator {
    driver: Handle,
    prepare: Arc<dyn TaskExecutor>,
    apply: Arc<dyn TaskExecutor>,
}

impl ReloadOrchestrator {
    pub fn new(driver: Handle, prepare: Arc<dyn TaskExecutor>, apply: Arc<dyn TaskExecutor>) -> Self {
        Self {
            driver,
            prepare,
            apply,
        }
    }

    /// Both phases on the runtime's blocking pool.
    pub fn on_runtime(driver: Handle) -> Self {
        let pool: Arc<dyn TaskExecutor> = Arc::new(driver.clone());
        Self::new(driver, Arc::clone(&pool), pool)
    }

    /// Starts a cycle and returns immediately.
    pub fn start<F>(
        &self,
        manager: Arc<ResourceManager>,
        reloaders: Vec<Arc<dyn Reloader>>,
        initial: F,
        profiled: bool,
    ) -> ReloadHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if profiled {
            self.start_with(ProfilingDecorator, manager, reloaders, initial)
        } else {
            self.start_with(PlainReload, manager, reloaders, initial)
        }
    }

    pub fn start_with<S, F>(
        &self,
        strategy: S,
        manager: Arc<ResourceManager>,
        reloaders: Vec<Arc<dyn Reloader>>,
        initial: F,
    ) -> ReloadHandle
    where
        S: ReloadStrategy,
        F: Future<Output = ()> + Send + 'static,
    {
        let started = Instant::now();
        let reloader_count = reloaders.len();
        let counters = Arc::new(ProgressCounters::default());
        let (ready_tx, ready_rx) = watch::channel(false);
        let barrier = Arc::new(Barrier::new(reloader_count, ready_rx.clone()));
        let (state_tx, state_rx) = watch::channel(ReloadState::Running);

        // The initial signal is one apply unit of its own.
        counters.schedule(Phase::Apply);
        let initial_counters = Arc::clone(&counters);
        self.driver.spawn(async move {
            initial.await;
            initial_counters.complete(Phase::Apply);
            ready_tx.send_replace(true);
        });

        let strategy = Arc::new(strategy);
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel::<ReloaderOutcome<S::Output>>();
        for (slot, reloader) in reloaders.into_iter().enumerate() {
            let name = reloader.name().to_string();
            let ctx = ReloadContext::new(
                BarrierHandle::new(Arc::clone(&barrier), slot),
                Arc::clone(&manager),
                PhaseExecutor::new(Phase::Prepare, Arc::clone(&self.prepare), Arc::clone(&counters)),
                PhaseExecutor::new(Phase::Apply, Arc::clone(&self.apply), Arc::clone(&counters)),
            );
            let task = self.driver.spawn(strategy.invoke(reloader, ctx));

            let outcome_tx = outcome_tx.clone();
            self.driver.spawn(async move {
                let result = match task.await {
                    Ok(Ok(output)) => Ok(output),
                    Ok(Err(source)) => Err(ReloadError::Reloader {
                        reloader: name,
                        source: Arc::new(source),
                    }),
                    Err(error) if error.is_panic() => {
                        Err(ReloadError::ReloaderPanicked { reloader: name })
                    }
                    Err(_) => Err(ReloadError::Abandoned),
                };
                let _ = outcome_tx.send(ReloaderOutcome { slot, result });
            });
        }
        drop(outcome_tx);

        self.driver.spawn(aggregate(
            strategy,
            reloader_count,
            outcome_rx,
            ready_rx,
            state_tx,
            started,
        ));

        ReloadHandle::new(reloader_count, counters, barrier, state_rx)
    }
}

/// Fans per-reloader outcomes into the cycle state. The first failure ends
/// the cycle; later outcomes are never read.
async fn aggregate<S: ReloadStrategy>(
    strategy: Arc<S>,
    reloader_count: usize,
    mut outcomes: mpsc::UnboundedReceiver<ReloaderOutcome<S::Output>>,
    mut ready: watch::Receiver<bool>,
    state: watch::Sender<ReloadState>,
    started: Instant,
) {
    let mut outputs = std::iter::repeat_with(|| None)
        .take(reloader_count)
        .collect::<Vec<Option<S::Output>>>();
    let mut remaining = reloader_count;
    let mut failure = None::<ReloadError>;

    while remaining > 0 {
        match outcomes.recv().await {
            Some(ReloaderOutcome {
                slot,
                result: Ok(output),
            }) => {
                outputs[slot] = Some(output);
                remaining -= 1;
            }
            Some(ReloaderOutcome {
                result: Err(error), ..
            }) => {
                failure = Some(error);
                break;
            }
            None => {
                failure = Some(ReloadError::Abandoned);
                break;
            }
        }
    }

    if failure.is_none() {
        let became_ready = ready.wait_for(|ready| *ready).await.is_ok();
        if !became_ready {
            failure = Some(ReloadError::Abandoned);
        }
    }

    let next = match failure {
        None => {
            let outputs = outputs.into_iter().flatten().collect::<Vec<_>>();
            let profiles = strategy.finish(outputs, started.elapsed());
            info!(
                reloader_count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "resource_reload_succeeded"
            );
            ReloadState::Succeeded {
                profiles: profiles.into(),
            }
        }
        Some(error) => {
            warn!(%error, reloader_count, "resource_reload_failed");
            ReloadState::Failed(error)
        }
    };
    state.send_replace(next);
}

impl std::fmt::Debug for ReloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadOrchestrator").finish_non_exhaustive()
    }
}
