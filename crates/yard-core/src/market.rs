//! Registries where released blocks are published.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use yard_fs::ConfigStore;

use crate::error::Result;
use crate::metadata::{self, Metadata};
use crate::version::VersionId;

/// File listing a published block's versions, newest first.
pub const VERSIONS_FILE: &str = "versions.toml";

/// Changelog file name, both in blocks and in market entries.
pub const CHANGELOG: &str = "CHANGELOG.md";

/// Publish transport for a market.
pub trait Market {
    fn name(&self) -> &str;

    /// Record a release. `versions` is every released version, newest first.
    fn publish(
        &self,
        metadata: &Metadata,
        versions: &[VersionId],
        changelog: Option<&str>,
    ) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VersionList {
    versions: Vec<String>,
}

/// A market backed by a plain directory tree: `<root>/<library>/<name>/`.
#[derive(Debug, Clone)]
pub struct DirectoryMarket {
    name: String,
    root: PathBuf,
}

impl DirectoryMarket {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a published block.
    pub fn entry_dir(&self, library: &str, name: &str) -> PathBuf {
        self.root.join(library).join(name)
    }

    /// Every published block directory, sorted.
    pub fn entries(&self) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        if !self.root.is_dir() {
            return Ok(found);
        }
        for library in std::fs::read_dir(&self.root)? {
            let library = library?.path();
            if !library.is_dir() {
                continue;
            }
            for block in std::fs::read_dir(&library)? {
                let block = block?.path();
                if metadata::has_marker(&block) {
                    found.push(block);
                }
            }
        }
        found.sort();
        Ok(found)
    }

    /// Published versions of a block, newest first.
    pub fn versions(&self, library: &str, name: &str) -> Result<Vec<VersionId>> {
        let path = self.entry_dir(library, name).join(VERSIONS_FILE);
        let list: VersionList = ConfigStore::new().load_or_default(&path)?;
        Ok(list.versions.iter().map(|v| VersionId::parse(v)).collect())
    }
}

impl Market for DirectoryMarket {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(
        &self,
        metadata: &Metadata,
        versions: &[VersionId],
        changelog: Option<&str>,
    ) -> Result<()> {
        let library = metadata.library.as_deref().unwrap_or_default();
        let name = metadata.name.as_deref().unwrap_or_default();
        let dir = self.entry_dir(library, name);
        std::fs::create_dir_all(&dir)?;

        metadata.write(&dir)?;
        let list = VersionList {
            versions: versions.iter().map(ToString::to_string).collect(),
        };
        ConfigStore::new().save(&dir.join(VERSIONS_FILE), &list)?;
        if let Some(text) = changelog {
            yard_fs::io::write_text(dir.join(CHANGELOG), text)?;
        }

        tracing::info!(
            market = %self.name,
            block = %format!("{library}.{name}"),
            version = %metadata.version,
            "published release"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn meta() -> Metadata {
        Metadata {
            name: Some("adder".into()),
            library: Some("math".into()),
            version: VersionId::new(1, 1, 0),
            market: Some("open".into()),
            remote: Some("/srv/git/adder.git".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_publish_writes_entry() {
        let temp = TempDir::new().unwrap();
        let market = DirectoryMarket::new("open", temp.path());
        let versions = vec![VersionId::new(1, 1, 0), VersionId::new(1, 0, 0)];

        market.publish(&meta(), &versions, Some("# Changes\n")).unwrap();

        let dir = market.entry_dir("math", "adder");
        let (published, complete) = Metadata::read(&dir).unwrap();
        assert!(complete);
        assert_eq!(published, meta());
        assert_eq!(market.versions("math", "adder").unwrap(), versions);
        assert_eq!(
            std::fs::read_to_string(dir.join(CHANGELOG)).unwrap(),
            "# Changes\n"
        );
        assert_eq!(market.entries().unwrap(), vec![dir]);
    }

    #[test]
    fn test_missing_root_has_no_entries() {
        let temp = TempDir::new().unwrap();
        let market = DirectoryMarket::new("open", temp.path().join("absent"));
        assert!(market.entries().unwrap().is_empty());
    }
}
