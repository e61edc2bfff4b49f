mod barrier;
mod error;
mod executor;
mod handle;
mod lock;
mod orchestrator;
mod profiled;
mod progress;
mod reloader;


pub use barrier::BarrierHandle;
pub use error::{Phase, ReloadError, ReloaderError};
pub use executor::{task_queue, PhaseExecutor, QueuedExecutor, Task, TaskExecutor, TaskQueue};
pub use handle::{ReloadHandle, ReloadState};
pub use orchestrator::{PlainReload, ReloadFuture, ReloadOrchestrator, ReloadStrategy};
pub use profiled::{PhaseTimer, ProfilingDecorator, ReloaderProfile};
pub use progress::ProgressSnapshot;
pub use reloader::{
    ReloadContext, Reloader, SinglePreparation, SinglePreparationReloader, Synchronous,
    SynchronousReloader,
};

pub(crate) use lock::lock_recovering;
