mod descriptor;
mod hashing;
mod manager;
mod provider;

pub use descriptor::{InsertionPosition, PackDescriptor, PackFactory};
pub use manager::{PackManager, PackScanError};
pub use provider::{DirectoryPackProvider, PackProvider, StaticPackProvider};

pub(crate) use hashing::hash_pack_names;
