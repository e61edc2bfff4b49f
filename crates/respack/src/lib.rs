use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod config;
pub mod packs;
pub mod reload;
mod reloadable;
pub mod resource;

pub use config::{ReloadConfig, PROFILE_RELOAD_ENV_VAR};
pub use packs::{
    DirectoryPackProvider, InsertionPosition, PackDescriptor, PackFactory, PackManager,
    PackProvider, PackScanError, StaticPackProvider,
};
pub use reload::{
    task_queue, BarrierHandle, Phase, PhaseExecutor, ProfilingDecorator, ProgressSnapshot,
    QueuedExecutor, ReloadContext, ReloadError, ReloadHandle, ReloadOrchestrator, ReloadState,
    Reloader, ReloaderError, ReloaderProfile, SinglePreparation, SinglePreparationReloader,
    Synchronous, SynchronousReloader, TaskExecutor, TaskQueue,
};
pub use reloadable::ReloadableResourceManager;
pub use resource::{
    DirectoryPack, MemoryPack, Pack, PackError, PackMetadata, Resource, ResourceError, ResourceId,
    ResourceManager, ResourceType,
};

pub const ROOT_ENV_VAR: &str = "RESPACK_ROOT";

#[derive(Debug, Clone)]
pub struct PackPaths {
    pub root: PathBuf,
    pub resource_packs_dir: PathBuf,
    pub builtin_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "RESPACK_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or resourcepacks/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or resourcepacks/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/respack\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_pack_paths() -> Result<PackPaths, StartupError> {
    let root = resolve_root()?;
    Ok(pack_paths_under(root))
}

fn pack_paths_under(root: PathBuf) -> PackPaths {
    PackPaths {
        resource_packs_dir: root.join("resourcepacks"),
        builtin_dir: root.join("builtin"),
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_packs = path.join("resourcepacks").is_dir();

    cargo_toml && (has_crates || has_packs)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
