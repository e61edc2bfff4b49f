use serde::Deserialize;

pub const METADATA_FILE_NAME: &str = "pack.mcmeta";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackMetadata {
    pub description: String,
    pub pack_format: u32,
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    pack: PackMetadata,
}

/// Decodes a `pack.mcmeta` document. On failure the message names the JSON path
/// of the offending field.
pub(crate) fn parse_metadata(raw: &str) -> Result<PackMetadata, String> {
    let deserializer = &mut serde_json::Deserializer::from_str(raw);
    let file: MetadataFile = serde_path_to_error::deserialize(deserializer)
        .map_err(|error| format!("{} at `{}`", error.inner(), error.path()))?;
    Ok(file.pack)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_pack_section() {
        let metadata =
            parse_metadata(r#"{"pack":{"description":"High contrast","pack_format":3}}"#)
                .expect("metadata");
        assert_eq!(metadata.description, "High contrast");
        assert_eq!(metadata.pack_format, 3);
    }

    #[test]
    fn error_names_offending_field() {
        let error = parse_metadata(r#"{"pack":{"description":"x","pack_format":"three"}}"#)
            .expect_err("invalid");
        assert!(error.contains("pack.pack_format"), "{error}");
    }

    #[test]
    fn extra_fields_are_ignored() {
        let raw = r#"{
            "pack": {"description": "Builtin", "pack_format": 1, "supported_formats": [1, 2]},
            "filter": {"block": []}
        }"#;
        assert_eq!(
            parse_metadata(raw).expect("metadata"),
            PackMetadata {
                description: "Builtin".to_string(),
                pack_format: 1,
            }
        );
    }
}
