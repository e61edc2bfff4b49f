use std::sync::Arc;

use super::id::{ResourceId, ResourceType};
use super::manager::Resource;
use super::pack::Pack;

/// All packs that declare one namespace, kept in ascending priority order: the
/// last pack is the one that wins a single-result lookup.
#[derive(Clone)]
pub struct NamespacedView {
    kind: ResourceType,
    namespace: String,
    packs: Vec<Arc<dyn Pack>>,
}

impl NamespacedView {
    pub(crate) fn new(kind: ResourceType, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            packs: Vec::new(),
        }
    }

    pub(crate) fn add_pack(&mut self, pack: Arc<dyn Pack>) {
        self.packs.push(pack);
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn pack_names(&self) -> Vec<&str> {
        self.packs.iter().map(|pack| pack.name()).collect()
    }

    /// Highest-priority pack holding `id`.
    pub fn lookup(&self, id: &ResourceId) -> Option<Resource> {
        self.packs
            .iter()
            .rev()
            .find(|pack| pack.contains(self.kind, id))
            .map(|pack| Resource::new(Arc::clone(pack), self.kind, id.clone()))
    }

    /// Every pack holding `id`, lowest priority first.
    pub fn lookup_all(&self, id: &ResourceId) -> Vec<Resource> {
        self.packs
            .iter()
            .filter(|pack| pack.contains(self.kind, id))
            .map(|pack| Resource::new(Arc::clone(pack), self.kind, id.clone()))
            .collect()
    }

    /// Ids under `prefix` paired with the pack that wins each of them.
    pub(crate) fn find_resources(&self, prefix: &str) -> Vec<(ResourceId, Resource)> {
        let mut winners = std::collections::BTreeMap::<ResourceId, Resource>::new();
        for pack in &self.packs {
            for id in pack.find_resources(self.kind, &self.namespace, prefix) {
                let resource = Resource::new(Arc::clone(pack), self.kind, id.clone());
                winners.insert(id, resource);
            }
        }
        winners.into_iter().collect()
    }
}

impl std::fmt::Debug for NamespacedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedView")
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("packs", &self.pack_names())
            .finish()
    }
}
