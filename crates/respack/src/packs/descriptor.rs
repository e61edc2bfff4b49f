use std::fmt;
use std::sync::Arc;

use crate::resource::{Pack, PackError};

pub type PackFactory = Arc<dyn Fn() -> Result<Arc<dyn Pack>, PackError> + Send + Sync>;

/// Where an always-enabled pack lands when it is missing from the enabled list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPosition {
    /// Highest priority, end of the list.
    Top,
    /// Lowest priority, start of the list.
    Bottom,
}

impl InsertionPosition {
    /// Inserts `item` and returns its index. Pinned descriptors already sitting
    /// at this end keep their place.
    pub(crate) fn insert(self, items: &mut Vec<PackDescriptor>, item: PackDescriptor) -> usize {
        let pinned_here =
            |descriptor: &PackDescriptor| descriptor.is_pinned() && descriptor.position() == self;
        match self {
            Self::Bottom => {
                let index = items
                    .iter()
                    .position(|existing| !pinned_here(existing))
                    .unwrap_or(items.len());
                items.insert(index, item);
                index
            }
            Self::Top => {
                let index = items
                    .iter()
                    .rposition(|existing| !pinned_here(existing))
                    .map_or(0, |last_unpinned| last_unpinned + 1);
                items.insert(index, item);
                index
            }
        }
    }
}

/// Persistent record of a pack that can be materialized on demand.
#[derive(Clone)]
pub struct PackDescriptor {
    name: String,
    title: String,
    description: String,
    always_enabled: bool,
    pinned: bool,
    position: InsertionPosition,
    factory: PackFactory,
}

impl PackDescriptor {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Pack>, PackError> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: String::new(),
            always_enabled: false,
            pinned: false,
            position: InsertionPosition::Top,
            factory: Arc::new(factory),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn always_enabled(mut self) -> Self {
        self.always_enabled = true;
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }

    pub fn at(mut self, position: InsertionPosition) -> Self {
        self.position = position;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_always_enabled(&self) -> bool {
        self.always_enabled
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn position(&self) -> InsertionPosition {
        self.position
    }

    pub fn create_pack(&self) -> Result<Arc<dyn Pack>, PackError> {
        (self.factory)()
    }
}

impl PartialEq for PackDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for PackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackDescriptor")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("always_enabled", &self.always_enabled)
            .field("pinned", &self.pinned)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
