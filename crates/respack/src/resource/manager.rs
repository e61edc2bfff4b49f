use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use thiserror::Error;

use super::id::{ResourceId, ResourceType};
use super::namespaced::NamespacedView;
use super::pack::{Pack, PackError, ResourceStream};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource not found: {id}")]
    NotFound { id: ResourceId },
    #[error(transparent)]
    Pack(#[from] PackError),
}

/// One pack's copy of a resource.
#[derive(Clone)]
pub struct Resource {
    pack: Arc<dyn Pack>,
    kind: ResourceType,
    id: ResourceId,
}

impl Resource {
    pub(crate) fn new(pack: Arc<dyn Pack>, kind: ResourceType, id: ResourceId) -> Self {
        Self { pack, kind, id }
    }

    pub fn pack_name(&self) -> &str {
        self.pack.name()
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn open(&self) -> Result<ResourceStream, ResourceError> {
        Ok(self.pack.open(self.kind, &self.id)?)
    }

    pub fn read_to_vec(&self) -> Result<Vec<u8>, ResourceError> {
        let mut stream = self.open()?;
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|source| PackError::Io {
                path: self.id.pack_relative_path(self.kind).into(),
                source,
            })?;
        Ok(bytes)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("pack", &self.pack.name())
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}

/// Read-only snapshot over the packs enabled for one reload cycle.
///
/// Packs are passed lowest priority first. The snapshot owns them: [`close`]
/// closes every pack, after which lookups that reach a pack fail.
///
/// [`close`]: ResourceManager::close
pub struct ResourceManager {
    kind: ResourceType,
    packs: Vec<Arc<dyn Pack>>,
    views: BTreeMap<String, NamespacedView>,
}

impl ResourceManager {
    pub fn new(kind: ResourceType, packs: Vec<Arc<dyn Pack>>) -> Self {
        let mut views = BTreeMap::<String, NamespacedView>::new();
        for pack in &packs {
            for namespace in pack.namespaces(kind) {
                views
                    .entry(namespace.clone())
                    .or_insert_with(|| NamespacedView::new(kind, namespace))
                    .add_pack(Arc::clone(pack));
            }
        }
        Self { kind, packs, views }
    }

    pub fn empty(kind: ResourceType) -> Self {
        Self::new(kind, Vec::new())
    }

    pub fn resource_type(&self) -> ResourceType {
        self.kind
    }

    pub fn lookup(&self, id: &ResourceId) -> Result<Resource, ResourceError> {
        self.views
            .get(id.namespace())
            .and_then(|view| view.lookup(id))
            .ok_or_else(|| ResourceError::NotFound { id: id.clone() })
    }

    pub fn lookup_all(&self, id: &ResourceId) -> Result<Vec<Resource>, ResourceError> {
        let found = self
            .views
            .get(id.namespace())
            .map(|view| view.lookup_all(id))
            .unwrap_or_default();
        if found.is_empty() {
            return Err(ResourceError::NotFound { id: id.clone() });
        }
        Ok(found)
    }

    pub fn namespaces(&self) -> BTreeSet<String> {
        self.views.keys().cloned().collect()
    }

    pub fn view(&self, namespace: &str) -> Option<&NamespacedView> {
        self.views.get(namespace)
    }

    /// Packs in priority order, lowest first.
    pub fn packs(&self) -> impl Iterator<Item = &Arc<dyn Pack>> {
        self.packs.iter()
    }

    pub fn pack_names(&self) -> Vec<String> {
        self.packs.iter().map(|pack| pack.name().to_string()).collect()
    }

    /// Winning resource for every id under `prefix` in any namespace, keeping
    /// only ids whose path satisfies `filter`.
    pub fn find_resources<F>(&self, prefix: &str, filter: F) -> BTreeMap<ResourceId, Resource>
    where
        F: Fn(&ResourceId) -> bool,
    {
        let mut found = BTreeMap::new();
        for view in self.views.values() {
            for (id, resource) in view.find_resources(prefix) {
                if filter(&id) {
                    found.insert(id, resource);
                }
            }
        }
        found
    }

    pub fn close(&self) {
        for pack in &self.packs {
            pack.close();
        }
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("kind", &self.kind)
            .field("packs", &self.pack_names())
            .field("namespaces", &self.namespaces())
            .finish()
    }
}
