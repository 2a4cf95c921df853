//! [`TestBlock`] builder for block repositories.

use std::fs;
use std::path::{Path, PathBuf};

use git2::Repository;

use crate::git;

/// Suffix marking release tags as manager-owned.
pub const TAG_SUFFIX: &str = "-yard";

/// Name of the marker file at a block's root.
pub const MARKER: &str = "Block.toml";

/// A block working tree backed by a real git repository.
///
/// # Example
///
/// ```rust,no_run
/// use yard_test_utils::block::TestBlock;
///
/// let temp = tempfile::TempDir::new().unwrap();
/// let block = TestBlock::create(temp.path(), "math", "adder");
/// block.write_source("adder.vhd", "entity adder is end entity;");
/// block.release("1.0.0");
/// ```
pub struct TestBlock {
    pub path: PathBuf,
    pub library: String,
    pub name: String,
    repo: Repository,
    derives: Vec<String>,
    toplevel: Option<String>,
    bench: Option<String>,
}

impl TestBlock {
    /// Create `<parent>/<library>/<name>` with an unreleased marker and one commit.
    pub fn create(parent: &Path, library: &str, name: &str) -> Self {
        let path = parent.join(library).join(name);
        fs::create_dir_all(&path).unwrap();
        let repo = git::init_repo(&path);
        let block = Self {
            path,
            library: library.to_string(),
            name: name.to_string(),
            repo,
            derives: Vec::new(),
            toplevel: None,
            bench: None,
        };
        block.write_marker("0.0.0");
        git::commit_all(&block.repo, "Initial commit");
        block
    }

    /// The underlying git repository.
    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Write a file relative to the block root.
    pub fn write_source(&self, relative: &str, content: &str) {
        let target = self.path.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, content).unwrap();
    }

    /// Set the titles recorded under `derives` on the next marker write.
    pub fn set_derives(&mut self, derives: &[&str]) {
        self.derives = derives.iter().map(|d| d.to_string()).collect();
    }

    /// Set the top-level and bench recorded on the next marker write.
    pub fn set_top(&mut self, toplevel: Option<&str>, bench: Option<&str>) {
        self.toplevel = toplevel.map(str::to_string);
        self.bench = bench.map(str::to_string);
    }

    /// Write the marker with `version`, commit everything and tag the release.
    pub fn release(&self, version: &str) {
        self.write_marker(version);
        git::commit_all(&self.repo, &format!("Releases version {version}"));
        git::tag(&self.repo, &format!("v{version}{TAG_SUFFIX}"));
    }

    /// Commit everything and create a release tag whose marker disagrees
    /// with the tag, producing a corrupt release.
    pub fn release_corrupt(&self, tagged: &str, recorded: &str) {
        self.write_marker(recorded);
        git::commit_all(&self.repo, "Mismatched release");
        git::tag(&self.repo, &format!("v{tagged}{TAG_SUFFIX}"));
    }

    /// Rewrite the marker file without committing.
    pub fn write_marker(&self, version: &str) {
        let derives = self
            .derives
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let content = format!(
            "[block]\nname = \"{name}\"\nlibrary = \"{library}\"\nversion = \"{version}\"\n\
             summary = \"\"\ntoplevel = \"{top}\"\nbench = \"{bench}\"\nremote = \"\"\n\
             market = \"\"\nderives = [{derives}]\n",
            name = self.name,
            library = self.library,
            top = self.toplevel.as_deref().unwrap_or(""),
            bench = self.bench.as_deref().unwrap_or(""),
        );
        fs::write(self.path.join(MARKER), content).unwrap();
    }
}
