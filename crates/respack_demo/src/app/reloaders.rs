use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use respack::{
    ReloadContext, Reloader, ReloaderError, ResourceError, ResourceId, ResourceManager,
    SinglePreparationReloader, SynchronousReloader,
};
use tracing::{debug, info};

use super::locks::{read_recovering, write_recovering};

const LANGUAGE_FILE: &str = "base:lang/en_us.json";
const TEXTURE_PREFIX: &str = "textures";
const TEXTURE_EXTENSION: &str = ".png";

fn parse_id(raw: &str) -> Result<ResourceId, ReloaderError> {
    ResourceId::parse(raw).map_err(|err| ReloaderError::Other(Box::new(err)))
}

/// Translation keys merged across every pack; higher-priority packs win per key.
#[derive(Debug, Default)]
pub(crate) struct LanguageTable {
    entries: RwLock<BTreeMap<String, String>>,
}

impl LanguageTable {
    pub(crate) fn len(&self) -> usize {
        read_recovering(&self.entries, "language_table_len").len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        read_recovering(&self.entries, "language_table_get")
            .get(key)
            .cloned()
    }
}

impl SinglePreparationReloader for LanguageTable {
    type Prepared = BTreeMap<String, String>;

    fn prepare(&self, manager: &ResourceManager) -> Result<Self::Prepared, ReloaderError> {
        let id = parse_id(LANGUAGE_FILE)?;
        let copies = match manager.lookup_all(&id) {
            Ok(copies) => copies,
            Err(ResourceError::NotFound { .. }) => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };

        let mut merged = BTreeMap::new();
        for copy in copies {
            let bytes = copy.read_to_vec()?;
            let table: BTreeMap<String, String> = serde_json::from_slice(&bytes).map_err(|err| {
                ReloaderError::failed(format!("{} in pack {}: {err}", id, copy.pack_name()))
            })?;
            merged.extend(table);
        }
        Ok(merged)
    }

    fn apply(
        &self,
        prepared: Self::Prepared,
        _manager: &ResourceManager,
    ) -> Result<(), ReloaderError> {
        debug!(entries = prepared.len(), "language_table_applied");
        *write_recovering(&self.entries, "language_table_apply") = prepared;
        Ok(())
    }
}

/// Which pack supplies each texture.
#[derive(Debug, Default)]
pub(crate) struct TextureIndex {
    entries: Arc<RwLock<BTreeMap<ResourceId, String>>>,
}

impl TextureIndex {
    pub(crate) fn len(&self) -> usize {
        read_recovering(&self.entries, "texture_index_len").len()
    }
}

#[async_trait]
impl Reloader for TextureIndex {
    async fn reload(&self, ctx: ReloadContext) -> Result<(), ReloaderError> {
        let manager = Arc::clone(ctx.manager());
        let found = ctx
            .prepare()
            .run(move || {
                manager
                    .find_resources(TEXTURE_PREFIX, |id| id.path().ends_with(TEXTURE_EXTENSION))
                    .into_iter()
                    .map(|(id, resource)| (id, resource.pack_name().to_string()))
                    .collect::<BTreeMap<_, _>>()
            })
            .await?;

        let found = ctx.cross(found).await?;

        let entries = Arc::clone(&self.entries);
        ctx.apply()
            .run(move || {
                debug!(textures = found.len(), "texture_index_applied");
                *write_recovering(&entries, "texture_index_apply") = found;
            })
            .await?;
        Ok(())
    }
}

/// Logs what the new snapshot contains. All of its work happens after the barrier.
#[derive(Debug, Default)]
pub(crate) struct PackSummary {
    namespaces: RwLock<BTreeSet<String>>,
}

impl PackSummary {
    pub(crate) fn namespaces(&self) -> BTreeSet<String> {
        read_recovering(&self.namespaces, "pack_summary_namespaces").clone()
    }
}

impl SynchronousReloader for PackSummary {
    fn reload(&self, manager: &ResourceManager) -> Result<(), ReloaderError> {
        let namespaces = manager.namespaces();
        info!(
            packs = ?manager.pack_names(),
            namespaces = ?namespaces,
            "pack_summary"
        );
        *write_recovering(&self.namespaces, "pack_summary_apply") = namespaces;
        Ok(())
    }
}
