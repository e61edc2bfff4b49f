use std::future::Future;
use std::mem;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::config::ReloadConfig;
use crate::packs::{hash_pack_names, PackManager};
use crate::reload::{lock_recovering, ReloadError, ReloadHandle, ReloadOrchestrator, Reloader};
use crate::resource::{Pack, ResourceManager, ResourceType};

/// Owns the active [`ResourceManager`] for one resource type and the
/// reloaders that rebuild derived state whenever it is replaced.
pub struct ReloadableResourceManager {
    kind: ResourceType,
    config: ReloadConfig,
    reloaders: Mutex<Vec<Arc<dyn Reloader>>>,
    active: Mutex<Arc<ResourceManager>>,
}

impl ReloadableResourceManager {
    pub fn new(kind: ResourceType, config: ReloadConfig) -> Self {
        Self {
            kind,
            config,
            reloaders: Mutex::new(Vec::new()),
            active: Mutex::new(Arc::new(ResourceManager::empty(kind))),
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.kind
    }

    pub fn config(&self) -> ReloadConfig {
        self.config
    }

    /// Reloaders run in registration order on every later reload.
    pub fn register_reloader(&self, reloader: Arc<dyn Reloader>) {
        lock_recovering(&self.reloaders, "register_reloader").push(reloader);
    }

    pub fn reloader_count(&self) -> usize {
        lock_recovering(&self.reloaders, "reloader_count").len()
    }

    /// The snapshot built by the most recent reload.
    pub fn active(&self) -> Arc<ResourceManager> {
        Arc::clone(&lock_recovering(&self.active, "active_manager"))
    }

    /// Replaces the active snapshot with one over `packs` (lowest priority
    /// first) and starts a reload cycle on it.
    pub fn reload<F>(
        &self,
        orchestrator: &ReloadOrchestrator,
        initial: F,
        packs: Vec<Arc<dyn Pack>>,
    ) -> ReloadHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.close_active();

        let pack_names = packs
            .iter()
            .map(|pack| pack.name().to_string())
            .collect::<Vec<_>>();
        let manager = Arc::new(ResourceManager::new(self.kind, packs));
        *lock_recovering(&self.active, "install_manager") = Arc::clone(&manager);

        let reloaders = lock_recovering(&self.reloaders, "snapshot_reloaders").clone();
        info!(
            resource_type = ?self.kind,
            pack_count = pack_names.len(),
            packs = ?pack_names,
            enabled_packs_hash = %hash_pack_names(&pack_names),
            reloader_count = reloaders.len(),
            profiled = self.config.profile_reloads,
            "resource_reload_start"
        );
        orchestrator.start(manager, reloaders, initial, self.config.profile_reloads)
    }

    /// Rescans `pack_manager`, opens its enabled packs and reloads them.
    ///
    /// A scan or open failure yields an already-failed handle; no reloader
    /// runs and the active snapshot is left empty.
    pub fn rescan_and_reload<F>(
        &self,
        orchestrator: &ReloadOrchestrator,
        pack_manager: &mut PackManager,
        initial: F,
    ) -> ReloadHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.close_active();

        let packs = pack_manager
            .rescan()
            .and_then(|()| pack_manager.create_packs());
        match packs {
            Ok(packs) => self.reload(orchestrator, initial, packs),
            Err(error) => {
                warn!(resource_type = ?self.kind, error = %error, "resource_reload_scan_failed");
                ReloadHandle::failed(ReloadError::from(error))
            }
        }
    }

    /// Closes the active snapshot's packs. Lookups afterwards see an empty
    /// manager until the next reload.
    pub fn close(&self) {
        self.close_active();
    }

    fn close_active(&self) {
        let previous = {
            let mut active = lock_recovering(&self.active, "close_manager");
            mem::replace(&mut *active, Arc::new(ResourceManager::empty(self.kind)))
        };
        previous.close();
    }
}

impl std::fmt::Debug for ReloadableResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadableResourceManager")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("reloaders", &self.reloader_count())
            .finish_non_exhaustive()
    }
}
