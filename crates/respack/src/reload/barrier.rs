use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use super::error::ReloaderError;
use super::lock::lock_recovering;

/// Shared state of the prepare/apply barrier for one reload cycle.
///
/// `waiting` only shrinks; the `open` flag flips to `true` exactly once, when
/// the last reloader arrives.
#[derive(Debug)]
pub(crate) struct Barrier {
    reloader_count: usize,
    waiting: Mutex<HashSet<usize>>,
    open: watch::Sender<bool>,
    ready: watch::Receiver<bool>,
}

impl Barrier {
    pub(crate) fn new(reloader_count: usize, ready: watch::Receiver<bool>) -> Self {
        let (open, _) = watch::channel(reloader_count == 0);
        Self {
            reloader_count,
            waiting: Mutex::new((0..reloader_count).collect()),
            open,
            ready,
        }
    }

    /// Marks `slot` as prepared. Repeat arrivals are ignored.
    pub(crate) fn arrive(&self, slot: usize) {
        let opened = {
            let mut waiting = lock_recovering(&self.waiting, "barrier_arrive");
            waiting.remove(&slot) && waiting.is_empty()
        };
        if opened {
            self.open.send_replace(true);
            debug!(reloader_count = self.reloader_count, "reload_barrier_open");
        }
    }

    pub(crate) fn crossed_count(&self) -> usize {
        let waiting = lock_recovering(&self.waiting, "barrier_crossed_count").len();
        self.reloader_count - waiting
    }

    pub(crate) fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    /// Resolves once every reloader has arrived and the initial ready signal
    /// has fired.
    pub(crate) async fn wait_open(&self) -> Result<(), ReloaderError> {
        let mut open = self.open.subscribe();
        let opened = open.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(ReloaderError::BarrierAbandoned);
        }

        let mut ready = self.ready.clone();
        let became_ready = ready.wait_for(|ready| *ready).await.is_ok();
        if !became_ready {
            return Err(ReloaderError::BarrierAbandoned);
        }
        Ok(())
    }
}

/// The single synchronization primitive handed to a reloader.
#[derive(Debug, Clone)]
pub struct BarrierHandle {
    barrier: Arc<Barrier>,
    slot: usize,
}

impl BarrierHandle {
    pub(crate) fn new(barrier: Arc<Barrier>, slot: usize) -> Self {
        Self { barrier, slot }
    }

    /// Records that this reloader finished preparing and returns `payload`
    /// once every reloader of the cycle has done the same.
    ///
    /// Arrival is registered when this is called, not when the returned future
    /// is first polled.
    pub fn cross<T>(&self, payload: T) -> impl Future<Output = Result<T, ReloaderError>> + Send
    where
        T: Send + 'static,
    {
        self.barrier.arrive(self.slot);
        let barrier = Arc::clone(&self.barrier);
        async move {
            barrier.wait_open().await?;
            Ok(payload)
        }
    }

    pub fn is_open(&self) -> bool {
        self.barrier.is_open()
    }
}
