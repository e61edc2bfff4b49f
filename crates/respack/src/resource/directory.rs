use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use super::id::{is_valid_namespace, ResourceId, ResourceType};
use super::metadata::{parse_metadata, PackMetadata, METADATA_FILE_NAME};
use super::pack::{Pack, PackError, ResourceStream};

/// Pack rooted at a directory laid out as `<root>/<assets|data>/<namespace>/<path>`.
///
/// Files are opened per read; after [`Pack::close`] the pack serves nothing.
#[derive(Debug)]
pub struct DirectoryPack {
    name: String,
    root: PathBuf,
    closed: AtomicBool,
}

impl DirectoryPack {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn resource_path(&self, kind: ResourceType, id: &ResourceId) -> PathBuf {
        let mut path = self.root.join(kind.directory()).join(id.namespace());
        for segment in id.path().split('/') {
            path.push(segment);
        }
        path
    }
}

impl Pack for DirectoryPack {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, kind: ResourceType, id: &ResourceId) -> Result<ResourceStream, PackError> {
        if self.is_closed() {
            return Err(PackError::Closed {
                pack: self.name.clone(),
            });
        }
        let path = self.resource_path(kind, id);
        match fs::File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Err(PackError::NotFound {
                pack: self.name.clone(),
                id: id.clone(),
            }),
            Err(source) => Err(PackError::Io { path, source }),
        }
    }

    fn contains(&self, kind: ResourceType, id: &ResourceId) -> bool {
        !self.is_closed() && self.resource_path(kind, id).is_file()
    }

    fn namespaces(&self, kind: ResourceType) -> BTreeSet<String> {
        let type_dir = self.root.join(kind.directory());
        let entries = match fs::read_dir(&type_dir) {
            Ok(entries) => entries,
            Err(_) => return BTreeSet::new(),
        };

        let mut namespaces = BTreeSet::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if is_valid_namespace(&name) {
                namespaces.insert(name);
            } else {
                debug!(pack = %self.name, directory = %name, "pack_namespace_ignored");
            }
        }
        namespaces
    }

    fn find_resources(
        &self,
        kind: ResourceType,
        namespace: &str,
        prefix: &str,
    ) -> Vec<ResourceId> {
        let namespace_dir = self.root.join(kind.directory()).join(namespace);
        let prefix = prefix.trim_end_matches('/');
        let start = if prefix.is_empty() {
            namespace_dir.clone()
        } else {
            namespace_dir.join(prefix)
        };

        let mut found = Vec::<ResourceId>::new();
        collect_recursive(&namespace_dir, &start, namespace, &mut found);
        found.sort();
        found
    }

    fn metadata(&self) -> Result<Option<PackMetadata>, PackError> {
        let path = self.root.join(METADATA_FILE_NAME);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PackError::Io { path, source }),
        };
        parse_metadata(&raw)
            .map(Some)
            .map_err(|message| PackError::InvalidMetadata {
                pack: self.name.clone(),
                message,
            })
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

fn collect_recursive(root: &Path, current: &Path, namespace: &str, found: &mut Vec<ResourceId>) {
    let entries = match fs::read_dir(current) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_recursive(root, &path, namespace, found);
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let normalized = normalize_rel_path(rel);
        match ResourceId::new(namespace, &normalized) {
            Ok(id) => found.push(id),
            Err(error) => debug!(path = %path.display(), %error, "pack_file_ignored"),
        }
    }
}

fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::TempDir;

    use super::*;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent");
        }
        fs::write(path, content).expect("write");
    }

    fn seeded_pack(root: &Path) -> DirectoryPack {
        write_file(&root.join("assets/base/lang/en_us.json"), r#"{"a":"b"}"#);
        write_file(&root.join("assets/base/textures/block/stone.png"), "png");
        write_file(&root.join("assets/base/textures/item/apple.png"), "png");
        write_file(&root.join("assets/ui/textures/button.png"), "png");
        write_file(&root.join("assets/Bad Name/ignored.txt"), "x");
        write_file(&root.join("data/rules/loot.json"), "[]");
        DirectoryPack::new("file/seeded", root)
    }

    #[test]
    fn namespaces_skip_invalid_directory_names() {
        let temp = TempDir::new().expect("temp");
        let pack = seeded_pack(temp.path());
        let namespaces = pack.namespaces(ResourceType::ClientResources);
        assert_eq!(
            namespaces.into_iter().collect::<Vec<_>>(),
            vec!["base".to_string(), "ui".to_string()]
        );
        assert!(pack.namespaces(ResourceType::ServerData).contains("rules"));
    }

    #[test]
    fn open_reads_file_and_reports_missing_as_not_found() {
        let temp = TempDir::new().expect("temp");
        let pack = seeded_pack(temp.path());
        let id = ResourceId::parse("base:lang/en_us.json").expect("id");
        let mut text = String::new();
        pack.open(ResourceType::ClientResources, &id)
            .expect("open")
            .read_to_string(&mut text)
            .expect("read");
        assert_eq!(text, r#"{"a":"b"}"#);

        let missing = ResourceId::parse("base:lang/fr_fr.json").expect("id");
        assert!(!pack.contains(ResourceType::ClientResources, &missing));
        let error = pack
            .open(ResourceType::ClientResources, &missing)
            .err()
            .expect("missing");
        assert!(matches!(error, PackError::NotFound { .. }));
    }

    #[test]
    fn find_resources_walks_prefix_recursively() {
        let temp = TempDir::new().expect("temp");
        let pack = seeded_pack(temp.path());
        let found = pack.find_resources(ResourceType::ClientResources, "base", "textures");
        let paths = found.iter().map(|id| id.path()).collect::<Vec<_>>();
        assert_eq!(paths, vec!["textures/block/stone.png", "textures/item/apple.png"]);
        assert!(pack
            .find_resources(ResourceType::ClientResources, "base", "models")
            .is_empty());
    }

    #[test]
    fn closed_pack_refuses_reads() {
        let temp = TempDir::new().expect("temp");
        let pack = seeded_pack(temp.path());
        assert_eq!(pack.root(), temp.path());
        let id = ResourceId::parse("base:lang/en_us.json").expect("id");
        assert!(pack.contains(ResourceType::ClientResources, &id));

        pack.close();
        assert!(pack.is_closed());
        assert!(!pack.contains(ResourceType::ClientResources, &id));
        let error = pack
            .open(ResourceType::ClientResources, &id)
            .err()
            .expect("closed");
        assert!(matches!(error, PackError::Closed { .. }));
    }

    #[test]
    fn files_outside_the_root_are_unreachable() {
        let temp = TempDir::new().expect("temp");
        write_file(&temp.path().join("secret.txt"), "outside-root");
        let pack = seeded_pack(&temp.path().join("pack"));

        assert!(ResourceId::parse("base:../../../secret.txt").is_err());
        assert!(ResourceId::new("base", "lang/../../../../secret.txt").is_err());
        let listed = pack.find_resources(ResourceType::ClientResources, "base", "");
        assert!(listed.iter().all(|id| !id.path().contains("secret")));
    }

    #[test]
    fn metadata_missing_is_none_and_invalid_is_error() {
        let temp = TempDir::new().expect("temp");
        let pack = seeded_pack(temp.path());
        assert_eq!(pack.metadata().expect("metadata"), None);

        write_file(&temp.path().join(METADATA_FILE_NAME), r#"{"pack":{}}"#);
        let error = pack.metadata().expect_err("invalid");
        assert!(matches!(error, PackError::InvalidMetadata { .. }));

        write_file(
            &temp.path().join(METADATA_FILE_NAME),
            r#"{"pack":{"description":"Seeded","pack_format":1}}"#,
        );
        let metadata = pack.metadata().expect("metadata").expect("present");
        assert_eq!(metadata.description, "Seeded");
    }
}
