mod directory;
mod id;
mod manager;
mod memory;
mod metadata;
mod namespaced;
mod pack;

pub use directory::DirectoryPack;
pub use id::{is_valid_namespace, IdError, ResourceId, ResourceType, DEFAULT_NAMESPACE};
pub use manager::{Resource, ResourceError, ResourceManager};
pub use memory::MemoryPack;
pub use metadata::{PackMetadata, METADATA_FILE_NAME};
pub use namespaced::NamespacedView;
pub use pack::{Pack, PackError, ResourceStream};
