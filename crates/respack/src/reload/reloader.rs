use std::sync::Arc;

use async_trait::async_trait;

use crate::resource::ResourceManager;

use super::barrier::BarrierHandle;
use super::error::ReloaderError;
use super::executor::PhaseExecutor;
use super::profiled::PhaseTimer;

/// An independent unit of reload work.
///
/// `reload` runs its prepare work through [`ReloadContext::prepare`], crosses
/// the barrier exactly once with whatever it prepared, and only then submits
/// apply work through [`ReloadContext::apply`]. A reloader that never crosses
/// stalls the whole cycle.
#[async_trait]
pub trait Reloader: Send + Sync {
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    async fn reload(&self, ctx: ReloadContext) -> Result<(), ReloaderError>;
}

/// Everything a reloader receives for one cycle.
#[derive(Debug, Clone)]
pub struct ReloadContext {
    sync: BarrierHandle,
    manager: Arc<ResourceManager>,
    prepare: PhaseExecutor,
    apply: PhaseExecutor,
}

impl ReloadContext {
    pub(crate) fn new(
        sync: BarrierHandle,
        manager: Arc<ResourceManager>,
        prepare: PhaseExecutor,
        apply: PhaseExecutor,
    ) -> Self {
        Self {
            sync,
            manager,
            prepare,
            apply,
        }
    }

    pub(crate) fn with_timers(
        mut self,
        prepare_timer: Arc<PhaseTimer>,
        apply_timer: Arc<PhaseTimer>,
    ) -> Self {
        self.prepare = self.prepare.with_timer(prepare_timer);
        self.apply = self.apply.with_timer(apply_timer);
        self
    }

    pub fn sync(&self) -> &BarrierHandle {
        &self.sync
    }

    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    pub fn prepare(&self) -> &PhaseExecutor {
        &self.prepare
    }

    pub fn apply(&self) -> &PhaseExecutor {
        &self.apply
    }

    /// Shorthand for `self.sync().cross(payload).await`.
    pub async fn cross<T>(&self, payload: T) -> Result<T, ReloaderError>
    where
        T: Send + 'static,
    {
        self.sync.cross(payload).await
    }
}

/// Reloader that computes one value off-thread and then applies it.
pub trait SinglePreparationReloader: Send + Sync + 'static {
    type Prepared: Send + 'static;

    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Runs on the prepare executor; must not touch shared state.
    fn prepare(&self, manager: &ResourceManager) -> Result<Self::Prepared, ReloaderError>;

    /// Runs on the apply executor after every reloader has prepared.
    fn apply(
        &self,
        prepared: Self::Prepared,
        manager: &ResourceManager,
    ) -> Result<(), ReloaderError>;
}

/// Reloader whose whole job runs on the apply executor once the barrier opens.
pub trait SynchronousReloader: Send + Sync + 'static {
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn reload(&self, manager: &ResourceManager) -> Result<(), ReloaderError>;
}

/// Adapts a [`SinglePreparationReloader`] to [`Reloader`].
#[derive(Debug)]
pub struct SinglePreparation<R>(pub Arc<R>);

/// Adapts a [`SynchronousReloader`] to [`Reloader`].
#[derive(Debug)]
pub struct Synchronous<R>(pub Arc<R>);

#[async_trait]
impl<R: SinglePreparationReloader> Reloader for SinglePreparation<R> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn reload(&self, ctx: ReloadContext) -> Result<(), ReloaderError> {
        let inner = Arc::clone(&self.0);
        let manager = Arc::clone(ctx.manager());
        let prepared = ctx
            .prepare()
            .run(move || inner.prepare(&manager))
            .await??;

        let prepared = ctx.cross(prepared).await?;

        let inner = Arc::clone(&self.0);
        let manager = Arc::clone(ctx.manager());
        ctx.apply()
            .run(move || inner.apply(prepared, &manager))
            .await?
    }
}

#[async_trait]
impl<R: SynchronousReloader> Reloader for Synchronous<R> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn reload(&self, ctx: ReloadContext) -> Result<(), ReloaderError> {
        ctx.cross(()).await?;
        let inner = Arc::clone(&self.0);
        let manager = Arc::clone(ctx.manager());
        ctx.apply().run(move || inner.reload(&manager)).await?
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
