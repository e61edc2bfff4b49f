use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::Phase;

const PHASE_WEIGHT: usize = 2;
const BARRIER_WEIGHT: usize = 1;

/// Scheduled/finished task counts for both phases of one reload cycle.
#[derive(Debug, Default)]
pub(crate) struct ProgressCounters {
    prepare_scheduled: AtomicUsize,
    prepare_completed: AtomicUsize,
    apply_scheduled: AtomicUsize,
    apply_completed: AtomicUsize,
}

impl ProgressCounters {
    pub(crate) fn schedule(&self, phase: Phase) {
        self.scheduled(phase).fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn complete(&self, phase: Phase) {
        self.completed(phase).fetch_add(1, Ordering::SeqCst);
    }

    /// Completed counts are loaded before scheduled ones so a snapshot never
    /// shows more finished than scheduled work.
    pub(crate) fn snapshot(&self) -> ProgressSnapshot {
        let prepare_completed = self.prepare_completed.load(Ordering::SeqCst);
        let apply_completed = self.apply_completed.load(Ordering::SeqCst);
        let prepare_scheduled = self.prepare_scheduled.load(Ordering::SeqCst);
        let apply_scheduled = self.apply_scheduled.load(Ordering::SeqCst);
        ProgressSnapshot {
            prepare_scheduled,
            prepare_completed,
            apply_scheduled,
            apply_completed,
        }
    }

    fn scheduled(&self, phase: Phase) -> &AtomicUsize {
        match phase {
            Phase::Prepare => &self.prepare_scheduled,
            Phase::Apply => &self.apply_scheduled,
        }
    }

    fn completed(&self, phase: Phase) -> &AtomicUsize {
        match phase {
            Phase::Prepare => &self.prepare_completed,
            Phase::Apply => &self.apply_completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub prepare_scheduled: usize,
    pub prepare_completed: usize,
    pub apply_scheduled: usize,
    pub apply_completed: usize,
}

impl ProgressSnapshot {
    /// Each finished task is worth two units, each reloader past the barrier one.
    pub fn weighted_fraction(&self, reloader_count: usize, crossed: usize) -> f32 {
        let done = self.prepare_completed * PHASE_WEIGHT
            + self.apply_completed * PHASE_WEIGHT
            + crossed * BARRIER_WEIGHT;
        let total = self.prepare_scheduled * PHASE_WEIGHT
            + self.apply_scheduled * PHASE_WEIGHT
            + reloader_count * BARRIER_WEIGHT;
        if total == 0 {
            return 0.0;
        }
        (done as f32 / total as f32).min(1.0)
    }
}
