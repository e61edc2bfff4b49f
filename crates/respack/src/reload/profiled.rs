use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::error::ReloaderError;
use super::orchestrator::{ReloadFuture, ReloadStrategy};
use super::reloader::{ReloadContext, Reloader};

/// Accumulated run time of the tasks one reloader submitted to one phase.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    nanos: AtomicU64,
}

impl PhaseTimer {
    pub(crate) fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloaderProfile {
    pub name: String,
    pub prepare_time: Duration,
    pub apply_time: Duration,
}

impl ReloaderProfile {
    pub fn total_time(&self) -> Duration {
        self.prepare_time + self.apply_time
    }
}

/// Times every reloader's prepare and apply tasks and logs a summary once
/// the cycle succeeds. Barrier and failure behaviour are untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfilingDecorator;

impl ReloadStrategy for ProfilingDecorator {
    type Output = ReloaderProfile;

    fn invoke(&self, reloader: Arc<dyn Reloader>, ctx: ReloadContext) -> ReloadFuture<Self::Output> {
        let prepare_timer = Arc::new(PhaseTimer::default());
        let apply_timer = Arc::new(PhaseTimer::default());
        let ctx = ctx.with_timers(Arc::clone(&prepare_timer), Arc::clone(&apply_timer));
        Box::pin(async move {
            reloader.reload(ctx).await?;
            Ok::<_, ReloaderError>(ReloaderProfile {
                name: reloader.name().to_string(),
                prepare_time: prepare_timer.elapsed(),
                apply_time: apply_timer.elapsed(),
            })
        })
    }

    fn finish(&self, outputs: Vec<Self::Output>, elapsed: Duration) -> Vec<ReloaderProfile> {
        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            reloader_count = outputs.len(),
            "resource_reload_finished"
        );
        let mut blocking = Duration::ZERO;
        for profile in &outputs {
            info!(
                reloader = %profile.name,
                total_ms = profile.total_time().as_millis() as u64,
                prepare_ms = profile.prepare_time.as_millis() as u64,
                apply_ms = profile.apply_time.as_millis() as u64,
                "resource_reload_profile"
            );
            blocking += profile.apply_time;
        }
        info!(
            blocking_ms = blocking.as_millis() as u64,
            "resource_reload_blocking_total"
        );
        outputs
    }
}
