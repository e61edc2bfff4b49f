use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::packs::PackScanError;
use crate::resource::ResourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Prepare,
    Apply,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prepare => "prepare",
            Self::Apply => "apply",
        })
    }
}

/// Failure raised by a single reloader.
#[derive(Debug, Error)]
pub enum ReloaderError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("{phase} task was dropped before it produced a result")]
    TaskAbandoned { phase: Phase },
    #[error("reload barrier was dropped before it opened")]
    BarrierAbandoned,
    #[error("{message}")]
    Failed { message: String },
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ReloaderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Failure of a whole reload cycle, as reported by the handle.
#[derive(Debug, Clone, Error)]
pub enum ReloadError {
    #[error("pack scan failed: {0}")]
    PackScan(#[source] Arc<PackScanError>),
    #[error("reloader {reloader} failed: {source}")]
    Reloader {
        reloader: String,
        #[source]
        source: Arc<ReloaderError>,
    },
    #[error("reloader {reloader} panicked")]
    ReloaderPanicked { reloader: String },
    #[error("reload was dropped before it completed")]
    Abandoned,
}

impl From<PackScanError> for ReloadError {
    fn from(error: PackScanError) -> Self {
        Self::PackScan(Arc::new(error))
    }
}
