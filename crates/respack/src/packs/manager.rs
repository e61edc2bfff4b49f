use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::resource::{Pack, PackError};

use super::descriptor::PackDescriptor;
use super::hashing::hash_pack_names;
use super::provider::PackProvider;

#[derive(Debug, Error)]
pub enum PackScanError {
    #[error("pack provider {provider} failed to list packs: {source}")]
    Provider {
        provider: String,
        #[source]
        source: PackError,
    },
    #[error("failed to open pack {pack}: {source}")]
    CreatePack {
        pack: String,
        #[source]
        source: PackError,
    },
}

/// Tracks the available packs and the ordered subset that is enabled.
///
/// Enabled order is priority order: the first pack has the lowest priority.
pub struct PackManager {
    providers: Vec<Box<dyn PackProvider>>,
    available: BTreeMap<String, PackDescriptor>,
    enabled: Vec<PackDescriptor>,
}

impl PackManager {
    pub fn new(providers: Vec<Box<dyn PackProvider>>) -> Self {
        Self {
            providers,
            available: BTreeMap::new(),
            enabled: Vec::new(),
        }
    }

    /// Re-lists every provider and re-derives the enabled list from the names
    /// that were enabled before the scan. On failure nothing changes.
    pub fn rescan(&mut self) -> Result<(), PackScanError> {
        let previously_enabled = self.enabled_names();
        let mut available = BTreeMap::<String, PackDescriptor>::new();
        for provider in &self.providers {
            let mut add = |descriptor: PackDescriptor| {
                if let Some(replaced) = available.insert(descriptor.name().to_string(), descriptor)
                {
                    warn!(pack = %replaced.name(), provider = %provider.name(), "pack_descriptor_replaced");
                }
            };
            provider
                .register(&mut add)
                .map_err(|source| PackScanError::Provider {
                    provider: provider.name().to_string(),
                    source,
                })?;
        }

        self.available = available;
        self.set_enabled(previously_enabled);
        info!(
            available_count = self.available.len(),
            enabled_count = self.enabled.len(),
            enabled_packs_hash = %self.enabled_fingerprint(),
            "pack_scan_summary"
        );
        Ok(())
    }

    /// Unknown names are dropped; always-enabled packs missing from `names`
    /// are inserted at their declared position.
    pub fn set_enabled<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut enabled = Vec::<PackDescriptor>::new();
        for name in names {
            if let Some(descriptor) = self.available.get(name.as_ref()) {
                if !enabled.contains(descriptor) {
                    enabled.push(descriptor.clone());
                }
            }
        }
        for descriptor in self.available.values() {
            if descriptor.is_always_enabled() && !enabled.contains(descriptor) {
                descriptor
                    .position()
                    .insert(&mut enabled, descriptor.clone());
            }
        }
        self.enabled = enabled;
    }

    /// Appends `name` at the top of the priority order.
    pub fn enable(&mut self, name: &str) -> bool {
        match self.available.get(name) {
            Some(descriptor) if !self.enabled.contains(descriptor) => {
                self.enabled.push(descriptor.clone());
                true
            }
            _ => false,
        }
    }

    pub fn disable(&mut self, name: &str) -> bool {
        let before = self.enabled.len();
        self.enabled.retain(|descriptor| descriptor.name() != name);
        self.enabled.len() != before
    }

    pub fn available_names(&self) -> Vec<String> {
        self.available.keys().cloned().collect()
    }

    pub fn enabled_names(&self) -> Vec<String> {
        self.enabled
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&PackDescriptor> {
        self.available.get(name)
    }

    pub fn has_descriptor(&self, name: &str) -> bool {
        self.available.contains_key(name)
    }

    pub fn enabled(&self) -> &[PackDescriptor] {
        &self.enabled
    }

    pub fn enabled_fingerprint(&self) -> String {
        hash_pack_names(&self.enabled_names())
    }

    /// Opens the enabled packs in priority order. Packs opened before a
    /// failing factory are closed again.
    pub fn create_packs(&self) -> Result<Vec<Arc<dyn Pack>>, PackScanError> {
        let mut packs = Vec::<Arc<dyn Pack>>::with_capacity(self.enabled.len());
        for descriptor in &self.enabled {
            match descriptor.create_pack() {
                Ok(pack) => packs.push(pack),
                Err(source) => {
                    for pack in &packs {
                        pack.close();
                    }
                    return Err(PackScanError::CreatePack {
                        pack: descriptor.name().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(packs)
    }
}

impl std::fmt::Debug for PackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackManager")
            .field("providers", &self.providers.len())
            .field("available", &self.available_names())
            .field("enabled", &self.enabled_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::packs::descriptor::InsertionPosition;
    use crate::packs::provider::StaticPackProvider;
    use crate::resource::MemoryPack;

    fn descriptor(name: &str) -> PackDescriptor {
        let pack_name = name.to_string();
        PackDescriptor::new(name, move || {
            Ok(Arc::new(MemoryPack::new(pack_name.clone())) as Arc<dyn Pack>)
        })
    }

    /// Provider whose descriptor list can be swapped between scans.
    struct SwappableProvider {
        descriptors: Mutex<Vec<PackDescriptor>>,
        fail: AtomicBool,
    }

    impl SwappableProvider {
        fn new(descriptors: Vec<PackDescriptor>) -> Arc<Self> {
            Arc::new(Self {
                descriptors: Mutex::new(descriptors),
                fail: AtomicBool::new(false),
            })
        }
    }

    impl PackProvider for Arc<SwappableProvider> {
        fn name(&self) -> &str {
            "swappable"
        }

        fn register(&self, add: &mut dyn FnMut(PackDescriptor)) -> Result<(), PackError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PackError::Io {
                    path: PathBuf::from("resourcepacks"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                });
            }
            for descriptor in self.descriptors.lock().expect("descriptors").iter() {
                add(descriptor.clone());
            }
            Ok(())
        }
    }

    fn manager_with(descriptors: Vec<PackDescriptor>) -> PackManager {
        let mut manager = PackManager::new(vec![Box::new(StaticPackProvider::new(
            "static",
            descriptors,
        ))]);
        manager.rescan().expect("scan");
        manager
    }

    #[test]
    fn set_enabled_drops_unknown_names_and_keeps_order() {
        let mut manager = manager_with(vec![descriptor("a"), descriptor("b"), descriptor("c")]);
        manager.set_enabled(["c", "missing", "a"]);
        assert_eq!(manager.enabled_names(), vec!["c", "a"]);
    }

    #[test]
    fn always_enabled_packs_are_inserted_at_declared_position() {
        let mut manager = manager_with(vec![
            descriptor("a"),
            descriptor("b"),
            descriptor("builtin")
                .always_enabled()
                .pinned()
                .at(InsertionPosition::Bottom),
            descriptor("overlay")
                .always_enabled()
                .at(InsertionPosition::Top),
        ]);
        manager.set_enabled(["a", "b"]);
        assert_eq!(manager.enabled_names(), vec!["builtin", "a", "b", "overlay"]);
        let builtin = manager.descriptor("builtin").expect("builtin descriptor");
        assert!(builtin.is_pinned());
        assert_eq!(builtin.position(), InsertionPosition::Bottom);
        assert!(manager.descriptor("missing").is_none());
    }

    #[test]
    fn rescan_preserves_enabled_packs_that_still_exist() {
        let provider = SwappableProvider::new(vec![
            descriptor("a"),
            descriptor("b"),
            descriptor("gone"),
            descriptor("builtin")
                .always_enabled()
                .at(InsertionPosition::Bottom),
        ]);
        let mut manager = PackManager::new(vec![Box::new(Arc::clone(&provider))]);
        manager.rescan().expect("first scan");
        manager.set_enabled(["a", "gone", "b"]);
        assert_eq!(manager.enabled_names(), vec!["builtin", "a", "gone", "b"]);

        *provider.descriptors.lock().expect("descriptors") = vec![
            descriptor("b"),
            descriptor("a"),
            descriptor("new"),
            descriptor("builtin")
                .always_enabled()
                .at(InsertionPosition::Bottom),
        ];
        let captured = manager.enabled_names();
        manager.rescan().expect("second scan");
        assert_eq!(manager.enabled_names(), vec!["builtin", "a", "b"]);

        manager.set_enabled(&captured);
        assert_eq!(manager.enabled_names(), vec!["builtin", "a", "b"]);
        assert!(manager.has_descriptor("new"));
    }

    #[test]
    fn failed_rescan_leaves_previous_state() {
        let provider = SwappableProvider::new(vec![descriptor("a")]);
        let mut manager = PackManager::new(vec![Box::new(Arc::clone(&provider))]);
        manager.rescan().expect("scan");
        manager.set_enabled(["a"]);

        provider.fail.store(true, Ordering::SeqCst);
        let error = manager.rescan().expect_err("scan should fail");
        assert!(matches!(error, PackScanError::Provider { ref provider, .. } if provider == "swappable"));
        assert_eq!(manager.enabled_names(), vec!["a"]);
        assert_eq!(manager.available_names(), vec!["a"]);
    }

    #[test]
    fn enable_and_disable_report_changes() {
        let mut manager = manager_with(vec![descriptor("a"), descriptor("b")]);
        assert!(manager.enable("b"));
        assert!(!manager.enable("b"));
        assert!(!manager.enable("missing"));
        assert!(manager.enable("a"));
        assert_eq!(manager.enabled_names(), vec!["b", "a"]);
        assert!(manager.disable("b"));
        assert!(!manager.disable("b"));
        assert_eq!(manager.enabled_names(), vec!["a"]);
    }

    #[test]
    fn create_packs_follows_enabled_order() {
        let mut manager = manager_with(vec![descriptor("a"), descriptor("b")]);
        manager.set_enabled(["b", "a"]);
        let packs = manager.create_packs().expect("packs");
        let names = packs.iter().map(|pack| pack.name()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn create_packs_closes_opened_packs_when_a_factory_fails() {
        let opened = Arc::new(MemoryPack::new("a"));
        let shared = Arc::clone(&opened);
        let good = PackDescriptor::new("a", move || Ok(Arc::clone(&shared) as Arc<dyn Pack>));
        let bad = PackDescriptor::new("bad", || {
            Err(PackError::Closed {
                pack: "bad".to_string(),
            })
        });
        let mut manager = manager_with(vec![good, bad]);
        manager.set_enabled(["a", "bad"]);

        let error = manager.create_packs().err().expect("factory failure");
        assert!(matches!(error, PackScanError::CreatePack { ref pack, .. } if pack == "bad"));
        assert!(opened.is_closed());
    }

    #[test]
    fn fingerprint_tracks_enabled_order() {
        let mut manager = manager_with(vec![descriptor("a"), descriptor("b")]);
        manager.set_enabled(["a", "b"]);
        let forward = manager.enabled_fingerprint();
        manager.set_enabled(["b", "a"]);
        assert_ne!(forward, manager.enabled_fingerprint());
    }
}
