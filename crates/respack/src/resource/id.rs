use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "base";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceType {
    ClientResources,
    ServerData,
}

impl ResourceType {
    pub fn directory(self) -> &'static str {
        match self {
            Self::ClientResources => "assets",
            Self::ServerData => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId {
    namespace: String,
    path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("resource namespace cannot be empty in `{raw}`")]
    EmptyNamespace { raw: String },
    #[error("resource path cannot be empty in `{raw}`")]
    EmptyPath { raw: String },
    #[error("invalid character {ch:?} in namespace of `{raw}`")]
    InvalidNamespace { raw: String, ch: char },
    #[error("invalid character {ch:?} in path of `{raw}`")]
    InvalidPath { raw: String, ch: char },
    #[error("path segment {segment:?} is not allowed in `{raw}`")]
    InvalidSegment { raw: String, segment: String },
}

impl ResourceId {
    pub fn new(namespace: &str, path: &str) -> Result<Self, IdError> {
        let raw = format!("{namespace}:{path}");
        if namespace.is_empty() {
            return Err(IdError::EmptyNamespace { raw });
        }
        if path.is_empty() {
            return Err(IdError::EmptyPath { raw });
        }
        if let Some(ch) = namespace.chars().find(|ch| !is_namespace_char(*ch)) {
            return Err(IdError::InvalidNamespace { raw, ch });
        }
        if let Some(ch) = path.chars().find(|ch| !is_path_char(*ch)) {
            return Err(IdError::InvalidPath { raw, ch });
        }
        // Paths are joined onto pack roots, so they must not climb out of them.
        if let Some(segment) = path
            .split('/')
            .find(|segment| matches!(*segment, "" | "." | ".."))
        {
            let segment = segment.to_string();
            return Err(IdError::InvalidSegment { raw, segment });
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Parses `namespace:path`; an id without a colon lives in [`DEFAULT_NAMESPACE`].
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        match raw.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Self::new(DEFAULT_NAMESPACE, raw),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Location of this resource relative to a pack root.
    pub fn pack_relative_path(&self, kind: ResourceType) -> String {
        format!("{}/{}/{}", kind.directory(), self.namespace, self.path)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && namespace.chars().all(is_namespace_char)
}

fn is_namespace_char(ch: char) -> bool {
    matches!(ch, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

fn is_path_char(ch: char) -> bool {
    is_namespace_char(ch) || ch == '/'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_namespace_and_path() {
        let id = ResourceId::parse("ui:textures/button.png").expect("id");
        assert_eq!(id.namespace(), "ui");
        assert_eq!(id.path(), "textures/button.png");
        assert_eq!(id.to_string(), "ui:textures/button.png");
    }

    #[test]
    fn parse_without_namespace_uses_default() {
        let id: ResourceId = "lang/en_us.json".parse().expect("id");
        assert_eq!(id.namespace(), DEFAULT_NAMESPACE);
        assert_eq!(
            id.pack_relative_path(ResourceType::ClientResources),
            "assets/base/lang/en_us.json"
        );
    }

    #[test]
    fn parse_rejects_invalid_characters() {
        assert_eq!(
            ResourceId::parse("Base:foo"),
            Err(IdError::InvalidNamespace {
                raw: "Base:foo".to_string(),
                ch: 'B'
            })
        );
        assert!(matches!(
            ResourceId::parse("base:foo bar"),
            Err(IdError::InvalidPath { ch: ' ', .. })
        ));
        assert!(matches!(
            ResourceId::parse("base:"),
            Err(IdError::EmptyPath { .. })
        ));
        assert!(!is_valid_namespace("has/slash"));
    }

    #[test]
    fn parse_rejects_relative_and_empty_segments() {
        assert_eq!(
            ResourceId::parse("base:../../../secret.txt"),
            Err(IdError::InvalidSegment {
                raw: "base:../../../secret.txt".to_string(),
                segment: "..".to_string(),
            })
        );
        for raw in ["base:textures/./a.png", "base:textures//a.png", "base:/a.png", "base:lang/"] {
            assert!(
                matches!(ResourceId::parse(raw), Err(IdError::InvalidSegment { .. })),
                "{raw}"
            );
        }
        let dotted = ResourceId::parse("base:models/.hidden/a..b.json").expect("dots inside names");
        assert_eq!(dotted.path(), "models/.hidden/a..b.json");
    }
}
