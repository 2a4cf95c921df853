//! The block marker file and its metadata record.
//!
//! A directory is a block when it holds [`MARKER`]. The file is a single
//! `[block]` table whose keys are always written in the same order; absent
//! values are written as empty strings and read back as `None`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::title::Requirement;
use crate::version::VersionId;

/// File name of the marker at a block's root.
pub const MARKER: &str = "Block.toml";

/// Keys every complete marker carries, in write order.
pub const MARKER_KEYS: [&str; 9] = [
    "name", "library", "version", "summary", "toplevel", "bench", "remote", "market", "derives",
];

/// Metadata recorded in a block's marker file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, with = "blank")]
    pub name: Option<String>,
    #[serde(default, with = "blank")]
    pub library: Option<String>,
    #[serde(default, with = "version_text")]
    pub version: VersionId,
    #[serde(default, with = "blank")]
    pub summary: Option<String>,
    #[serde(default, with = "blank")]
    pub toplevel: Option<String>,
    #[serde(default, with = "blank")]
    pub bench: Option<String>,
    #[serde(default, with = "blank")]
    pub remote: Option<String>,
    #[serde(default, with = "blank")]
    pub market: Option<String>,
    #[serde(default)]
    pub derives: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MarkerFile {
    #[serde(default)]
    block: Metadata,
}

impl Metadata {
    /// Parse marker text. The flag reports whether every key was present.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<(Self, bool)> {
        let parse_err = |e: toml::de::Error| Error::MarkerParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let table: toml::Table = toml::from_str(text).map_err(parse_err)?;
        let complete = table
            .get("block")
            .and_then(|b| b.as_table())
            .is_some_and(|b| MARKER_KEYS.iter().all(|k| b.contains_key(*k)));

        let file: MarkerFile = toml::from_str(text).map_err(parse_err)?;
        Ok((file.block, complete))
    }

    /// Render the full marker text in fixed key order.
    pub fn to_toml_string(&self, path: &Path) -> Result<String> {
        let file = MarkerFile {
            block: self.clone(),
        };
        toml::to_string(&file).map_err(|e| Error::MarkerSerialize {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read the marker in `dir`.
    pub fn read(dir: &Path) -> Result<(Self, bool)> {
        let path = dir.join(MARKER);
        let text = yard_fs::io::read_text(&path)?;
        Self::from_toml_str(&text, &path)
    }

    /// Write the marker in `dir`, replacing any existing one.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MARKER);
        let text = self.to_toml_string(&path)?;
        yard_fs::io::write_text(&path, &text)?;
        Ok(())
    }

    /// Parsed `derives` entries. Malformed entries are logged and dropped.
    pub fn requirements(&self) -> Vec<Requirement> {
        self.derives
            .iter()
            .filter_map(|entry| match Requirement::parse(entry) {
                Ok(req) => Some(req),
                Err(e) => {
                    tracing::warn!(entry = %entry, error = %e, "ignoring malformed derives entry");
                    None
                }
            })
            .collect()
    }
}

/// Whether `dir` holds a marker file.
pub fn has_marker(dir: &Path) -> bool {
    dir.join(MARKER).is_file()
}

mod blank {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value: Option<String> = Option::deserialize(d)?;
        Ok(value.filter(|s| !s.trim().is_empty()))
    }
}

mod version_text {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::version::VersionId;

    pub fn serialize<S: Serializer>(value: &VersionId, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{}.{}.{}", value.major(), value.minor(), value.patch()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<VersionId, D::Error> {
        let text = String::deserialize(d)?;
        Ok(VersionId::parse(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const FULL: &str = r#"[block]
name = "adder"
library = "math"
version = "1.2.3"
summary = ""
toplevel = "adder"
bench = ""
remote = ""
market = ""
derives = ["math.half_adder(v1.0.0)"]
"#;

    #[test]
    fn test_parse_full_marker() {
        let (meta, complete) = Metadata::from_toml_str(FULL, Path::new("Block.toml")).unwrap();
        assert!(complete);
        assert_eq!(meta.name.as_deref(), Some("adder"));
        assert_eq!(meta.version, VersionId::new(1, 2, 3));
        assert_eq!(meta.bench, None);
        assert_eq!(meta.requirements().len(), 1);
    }

    #[test]
    fn test_missing_keys_are_defaulted_and_flagged() {
        let text = "[block]\nname = \"adder\"\nlibrary = \"math\"\n";
        let (meta, complete) = Metadata::from_toml_str(text, Path::new("Block.toml")).unwrap();
        assert!(!complete);
        assert_eq!(meta.version, VersionId::default());
        assert!(meta.derives.is_empty());
    }

    #[test]
    fn test_serialization_keeps_fixed_key_order() {
        let (meta, _) = Metadata::from_toml_str(FULL, Path::new("Block.toml")).unwrap();
        let text = meta.to_toml_string(Path::new("Block.toml")).unwrap();
        assert_eq!(text, FULL);
    }

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let meta = Metadata {
            name: Some("adder".into()),
            library: Some("math".into()),
            version: VersionId::new(0, 3, 0),
            ..Metadata::default()
        };

        meta.write(temp.path()).unwrap();
        assert!(has_marker(temp.path()));
        let (read, complete) = Metadata::read(temp.path()).unwrap();

        assert!(complete);
        assert_eq!(read, meta);
    }

    #[test]
    fn test_malformed_derives_are_dropped() {
        let meta = Metadata {
            derives: vec!["math.adder".into(), "broken".into()],
            ..Metadata::default()
        };
        assert_eq!(meta.requirements().len(), 1);
    }

    #[test]
    fn test_invalid_toml_is_marker_parse_error() {
        let err = Metadata::from_toml_str("[block\n", Path::new("Block.toml")).unwrap_err();
        assert!(matches!(err, Error::MarkerParse { .. }));
    }
}
