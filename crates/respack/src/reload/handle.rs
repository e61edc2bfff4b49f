use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use super::barrier::Barrier;
use super::error::ReloadError;
use super::profiled::ReloaderProfile;
use super::progress::{ProgressCounters, ProgressSnapshot};

/// Highest progress reported while the aggregate is still running.
const IN_FLIGHT_CEILING: f32 = 0.99;

#[derive(Debug, Clone)]
pub enum ReloadState {
    Running,
    Succeeded { profiles: Arc<[ReloaderProfile]> },
    Failed(ReloadError),
}

impl ReloadState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    fn outcome(&self) -> Option<Result<(), ReloadError>> {
        match self {
            Self::Running => None,
            Self::Succeeded { .. } => Some(Ok(())),
            Self::Failed(error) => Some(Err(error.clone())),
        }
    }
}

/// Caller-facing view of one reload cycle. Cheap to clone; clones observe the
/// same cycle.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    reloader_count: usize,
    counters: Arc<ProgressCounters>,
    barrier: Option<Arc<Barrier>>,
    state: watch::Receiver<ReloadState>,
    reported_progress: Arc<AtomicU32>,
}

impl ReloadHandle {
    pub(crate) fn new(
        reloader_count: usize,
        counters: Arc<ProgressCounters>,
        barrier: Arc<Barrier>,
        state: watch::Receiver<ReloadState>,
    ) -> Self {
        Self {
            reloader_count,
            counters,
            barrier: Some(barrier),
            state,
            reported_progress: Arc::new(AtomicU32::new(0)),
        }
    }

    /// A cycle that failed before any reloader ran.
    pub fn failed(error: ReloadError) -> Self {
        let (_, state) = watch::channel(ReloadState::Failed(error));
        Self {
            reloader_count: 0,
            counters: Arc::new(ProgressCounters::default()),
            barrier: None,
            state,
            reported_progress: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Resolves when every reloader has finished applying, or with the first
    /// failure.
    pub async fn await_completion(&self) -> Result<(), ReloadError> {
        let settled = self.state.borrow().outcome();
        if let Some(outcome) = settled {
            return outcome;
        }
        let mut state = self.state.clone();
        let waited = state
            .wait_for(ReloadState::is_terminal)
            .await
            .map(|current| current.outcome());
        match waited {
            Ok(Some(outcome)) => outcome,
            Ok(None) | Err(_) => {
                let last = self.state.borrow().outcome();
                last.unwrap_or(Err(ReloadError::Abandoned))
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_terminal()
    }

    pub fn is_barrier_crossed(&self) -> bool {
        self.barrier.as_ref().is_some_and(|barrier| barrier.is_open())
    }

    /// Fraction of weighted work done, in `[0, 1]`.
    ///
    /// Recomputed from the live counters on each call. The result never drops
    /// below a value this cycle already reported and reaches `1.0` only once
    /// the cycle has succeeded.
    pub fn progress(&self) -> f32 {
        let succeeded = matches!(&*self.state.borrow(), ReloadState::Succeeded { .. });
        let current = if succeeded {
            1.0
        } else {
            let crossed = self
                .barrier
                .as_ref()
                .map_or(0, |barrier| barrier.crossed_count());
            self.counters
                .snapshot()
                .weighted_fraction(self.reloader_count, crossed)
                .min(IN_FLIGHT_CEILING)
        };
        let previous = self
            .reported_progress
            .fetch_max(current.to_bits(), Ordering::AcqRel);
        current.max(f32::from_bits(previous))
    }

    pub fn rethrow_if_failed(&self) -> Result<(), ReloadError> {
        match &*self.state.borrow() {
            ReloadState::Failed(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }

    /// Per-reloader timings, present once a profiled cycle has succeeded.
    pub fn profiles(&self) -> Option<Arc<[ReloaderProfile]>> {
        match &*self.state.borrow() {
            ReloadState::Succeeded { profiles } if !profiles.is_empty() => {
                Some(Arc::clone(profiles))
            }
            _ => None,
        }
    }

    pub fn state(&self) -> ReloadState {
        self.state.borrow().clone()
    }

    pub fn reloader_count(&self) -> usize {
        self.reloader_count
    }

    pub fn counters(&self) -> ProgressSnapshot {
        self.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packs::PackScanError;
    use crate::reload::error::Phase;
    use crate::resource::PackError;

    fn scan_failure() -> ReloadError {
        ReloadError::from(PackScanError::CreatePack {
            pack: "broken".to_string(),
            source: PackError::Closed {
                pack: "broken".to_string(),
            },
        })
    }

    #[tokio::test]
    async fn failed_handle_is_complete_with_zero_progress() {
        let handle = ReloadHandle::failed(scan_failure());
        assert!(handle.is_complete());
        assert!(!handle.is_barrier_crossed());
        assert_eq!(handle.progress(), 0.0);
        assert_eq!(handle.reloader_count(), 0);
        assert!(matches!(
            handle.rethrow_if_failed(),
            Err(ReloadError::PackScan(_))
        ));
        assert!(matches!(
            handle.await_completion().await,
            Err(ReloadError::PackScan(_))
        ));
        assert!(handle.profiles().is_none());
    }

    #[tokio::test]
    async fn completion_is_observed_by_clones() {
        let (ready_tx, ready_rx) = watch::channel(true);
        let barrier = Arc::new(Barrier::new(0, ready_rx));
        let (state_tx, state_rx) = watch::channel(ReloadState::Running);
        let handle = ReloadHandle::new(0, Arc::new(ProgressCounters::default()), barrier, state_rx);
        let clone = handle.clone();
        assert!(!handle.is_complete());
        assert!(matches!(handle.state(), ReloadState::Running));

        let waiter = tokio::spawn(async move { clone.await_completion().await });
        state_tx.send_replace(ReloadState::Succeeded {
            profiles: Arc::from(Vec::new()),
        });
        waiter.await.expect("join").expect("success");
        assert!(handle.is_complete());
        assert!(matches!(handle.state(), ReloadState::Succeeded { .. }));
        assert_eq!(handle.progress(), 1.0);
        drop(ready_tx);
    }

    #[test]
    fn progress_never_reports_lower_value() {
        let (_ready_tx, ready_rx) = watch::channel(true);
        let barrier = Arc::new(Barrier::new(1, ready_rx));
        let (_state_tx, state_rx) = watch::channel(ReloadState::Running);
        let counters = Arc::new(ProgressCounters::default());
        let handle = ReloadHandle::new(1, Arc::clone(&counters), Arc::clone(&barrier), state_rx);

        counters.schedule(Phase::Prepare);
        counters.complete(Phase::Prepare);
        let before = handle.progress();
        assert!(before > 0.0);
        counters.schedule(Phase::Prepare);
        counters.schedule(Phase::Prepare);
        assert!(handle.progress() >= before);
        assert!(handle.progress() < 1.0);
    }
}
