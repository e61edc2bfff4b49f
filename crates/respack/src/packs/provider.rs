use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::resource::{DirectoryPack, Pack, PackError};

use super::descriptor::{InsertionPosition, PackDescriptor};

/// Source of pack descriptors, consulted once per rescan.
pub trait PackProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Hands every descriptor this provider currently knows about to `add`.
    fn register(&self, add: &mut dyn FnMut(PackDescriptor)) -> Result<(), PackError>;
}

/// Registers a fixed set of descriptors, e.g. builtin content.
#[derive(Debug, Clone)]
pub struct StaticPackProvider {
    name: String,
    descriptors: Vec<PackDescriptor>,
}

impl StaticPackProvider {
    pub fn new(name: impl Into<String>, descriptors: Vec<PackDescriptor>) -> Self {
        Self {
            name: name.into(),
            descriptors,
        }
    }
}

impl PackProvider for StaticPackProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn register(&self, add: &mut dyn FnMut(PackDescriptor)) -> Result<(), PackError> {
        for descriptor in &self.descriptors {
            add(descriptor.clone());
        }
        Ok(())
    }
}

/// Lists each subdirectory of a folder as a `file/<dir>` pack.
#[derive(Debug, Clone)]
pub struct DirectoryPackProvider {
    folder: PathBuf,
}

impl DirectoryPackProvider {
    pub const NAME_PREFIX: &'static str = "file/";

    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }
}

impl PackProvider for DirectoryPackProvider {
    fn name(&self) -> &str {
        "directory"
    }

    fn register(&self, add: &mut dyn FnMut(PackDescriptor)) -> Result<(), PackError> {
        if !self.folder.is_dir() {
            debug!(folder = %self.folder.display(), "pack_folder_missing");
            return Ok(());
        }

        let entries = fs::read_dir(&self.folder).map_err(|source| PackError::Io {
            path: self.folder.clone(),
            source,
        })?;
        let mut dirs = Vec::<(String, PathBuf)>::new();
        for entry in entries {
            let entry = entry.map_err(|source| PackError::Io {
                path: self.folder.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() {
                dirs.push((entry.file_name().to_string_lossy().to_string(), path));
            }
        }
        dirs.sort_by(|(a, _), (b, _)| a.cmp(b));

        for (dir_name, path) in dirs {
            let name = format!("{}{dir_name}", Self::NAME_PREFIX);
            let candidate = DirectoryPack::new(name.clone(), path.clone());
            let metadata = match candidate.metadata() {
                Ok(Some(metadata)) => metadata,
                Ok(None) => {
                    warn!(pack = %name, path = %path.display(), "pack_skipped_missing_metadata");
                    continue;
                }
                Err(error) => {
                    warn!(pack = %name, %error, "pack_skipped_invalid_metadata");
                    continue;
                }
            };

            let factory_name = name.clone();
            let descriptor = PackDescriptor::new(name, move || {
                Ok(Arc::new(DirectoryPack::new(factory_name.clone(), path.clone())) as Arc<dyn Pack>)
            })
            .with_title(dir_name)
            .with_description(metadata.description)
            .at(InsertionPosition::Top);
            add(descriptor);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::resource::{ResourceId, ResourceType, METADATA_FILE_NAME};

    fn write_pack(folder: &Path, dir: &str, metadata: Option<&str>) {
        let root = folder.join(dir);
        fs::create_dir_all(root.join("assets").join("base")).expect("pack dir");
        fs::write(root.join("assets").join("base").join("hello.txt"), dir).expect("resource");
        if let Some(metadata) = metadata {
            fs::write(root.join(METADATA_FILE_NAME), metadata).expect("metadata");
        }
    }

    fn collect(provider: &dyn PackProvider) -> Vec<PackDescriptor> {
        let mut out = Vec::new();
        provider.register(&mut |descriptor| out.push(descriptor)).expect("register");
        out
    }

    #[test]
    fn lists_directories_in_name_order_and_skips_missing_metadata() {
        let temp = TempDir::new().expect("temp");
        let meta = r#"{"pack":{"description":"d","pack_format":1}}"#;
        write_pack(temp.path(), "zeta", Some(meta));
        write_pack(temp.path(), "alpha", Some(meta));
        write_pack(temp.path(), "no_meta", None);
        write_pack(temp.path(), "broken", Some("{"));
        fs::write(temp.path().join("loose.txt"), "x").expect("loose file");

        let provider = DirectoryPackProvider::new(temp.path());
        let descriptors = collect(&provider);
        let names = descriptors.iter().map(PackDescriptor::name).collect::<Vec<_>>();
        assert_eq!(names, vec!["file/alpha", "file/zeta"]);
        assert_eq!(descriptors[0].title(), "alpha");
        assert_eq!(descriptors[0].description(), "d");
    }

    #[test]
    fn factory_opens_pack_at_directory() {
        let temp = TempDir::new().expect("temp");
        write_pack(
            temp.path(),
            "alpha",
            Some(r#"{"pack":{"description":"d","pack_format":1}}"#),
        );
        let descriptors = collect(&DirectoryPackProvider::new(temp.path()));
        let pack = descriptors[0].create_pack().expect("pack");
        assert_eq!(pack.name(), "file/alpha");
        let id = ResourceId::parse("base:hello.txt").expect("id");
        assert!(pack.contains(ResourceType::ClientResources, &id));
    }

    #[test]
    fn missing_folder_registers_nothing() {
        let temp = TempDir::new().expect("temp");
        let provider = DirectoryPackProvider::new(temp.path().join("absent"));
        assert_eq!(provider.folder(), temp.path().join("absent"));
        assert!(collect(&provider).is_empty());
    }

    #[test]
    fn static_provider_repeats_its_descriptors() {
        let provider = StaticPackProvider::new(
            "builtin",
            vec![PackDescriptor::new("builtin", || {
                Ok(Arc::new(crate::resource::MemoryPack::new("builtin")) as Arc<dyn Pack>)
            })],
        );
        assert_eq!(collect(&provider).len(), 1);
        assert_eq!(collect(&provider).len(), 1);
    }
}
