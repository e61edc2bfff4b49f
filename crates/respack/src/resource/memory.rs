use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::id::{ResourceId, ResourceType};
use super::metadata::PackMetadata;
use super::pack::{path_has_prefix, Pack, PackError, ResourceStream};

/// Pack backed by byte buffers held in memory. Used for builtin content that
/// ships inside the binary.
#[derive(Debug)]
pub struct MemoryPack {
    name: String,
    metadata: Option<PackMetadata>,
    resources: BTreeMap<(ResourceType, ResourceId), Arc<[u8]>>,
    closed: AtomicBool,
}

impl MemoryPack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            resources: BTreeMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_resource(
        mut self,
        kind: ResourceType,
        id: ResourceId,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.resources
            .insert((kind, id), Arc::from(bytes.into().into_boxed_slice()));
        self
    }

    pub fn with_metadata(mut self, metadata: PackMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), PackError> {
        if self.is_closed() {
            return Err(PackError::Closed {
                pack: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl Pack for MemoryPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, kind: ResourceType, id: &ResourceId) -> Result<ResourceStream, PackError> {
        self.ensure_open()?;
        let bytes = self
            .resources
            .get(&(kind, id.clone()))
            .cloned()
            .ok_or_else(|| PackError::NotFound {
                pack: self.name.clone(),
                id: id.clone(),
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn contains(&self, kind: ResourceType, id: &ResourceId) -> bool {
        !self.is_closed() && self.resources.contains_key(&(kind, id.clone()))
    }

    fn namespaces(&self, kind: ResourceType) -> BTreeSet<String> {
        self.resources
            .keys()
            .filter(|(entry_kind, _)| *entry_kind == kind)
            .map(|(_, id)| id.namespace().to_string())
            .collect()
    }

    fn find_resources(
        &self,
        kind: ResourceType,
        namespace: &str,
        prefix: &str,
    ) -> Vec<ResourceId> {
        self.resources
            .keys()
            .filter(|(entry_kind, id)| {
                *entry_kind == kind
                    && id.namespace() == namespace
                    && path_has_prefix(id.path(), prefix)
            })
            .map(|(_, id)| id.clone())
            .collect()
    }

    fn metadata(&self) -> Result<Option<PackMetadata>, PackError> {
        Ok(self.metadata.clone())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
