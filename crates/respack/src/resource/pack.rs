use std::collections::BTreeSet;
use std::io::{self, Read};
use std::path::PathBuf;

use thiserror::Error;

use super::id::{ResourceId, ResourceType};
use super::metadata::PackMetadata;

pub type ResourceStream = Box<dyn Read + Send>;

#[derive(Debug, Error)]
pub enum PackError {
    #[error("pack {pack} has no resource {id}")]
    NotFound { pack: String, id: ResourceId },
    #[error("pack {pack} is closed")]
    Closed { pack: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("pack {pack} has invalid metadata: {message}")]
    InvalidMetadata { pack: String, message: String },
}

/// A single-use provider of resource bytes for one reload cycle.
///
/// Packs are shared between the reloaders of a cycle, so every operation takes
/// `&self`; concurrent reads must be safe.
pub trait Pack: Send + Sync {
    fn name(&self) -> &str;

    fn open(&self, kind: ResourceType, id: &ResourceId) -> Result<ResourceStream, PackError>;

    fn contains(&self, kind: ResourceType, id: &ResourceId) -> bool;

    fn namespaces(&self, kind: ResourceType) -> BTreeSet<String>;

    /// Ids in `namespace` whose path starts with `prefix`, sorted.
    fn find_resources(&self, kind: ResourceType, namespace: &str, prefix: &str)
        -> Vec<ResourceId>;

    fn metadata(&self) -> Result<Option<PackMetadata>, PackError> {
        Ok(None)
    }

    fn close(&self) {}
}

/// `true` when `path` sits at or below `prefix` on a `/` boundary.
pub(crate) fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matches_on_segment_boundary() {
        assert!(path_has_prefix("textures/block/stone.png", "textures"));
        assert!(path_has_prefix("textures/block/stone.png", "textures/"));
        assert!(path_has_prefix("anything", ""));
        assert!(!path_has_prefix("textures_extra/a.png", "textures"));
    }
}
