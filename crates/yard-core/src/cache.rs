//! The installation cache.
//!
//! Layout below the cache root:
//!
//! ```text
//! <market or _>/<library>/<name>/<name>/    canonical copy, with history
//! <market or _>/<library>/<name>/v1.2.3/    exact snapshot, identifiers suffixed _v1_2_3
//! <market or _>/<library>/<name>/v1/        major pointer, identifiers suffixed _v1
//! ```
//!
//! The major pointer always holds the highest installed release of its major
//! line. Everything but the canonical copy's `.git` is kept read-only.

use std::path::{Path, PathBuf};

use yard_fs::tree::{self, VCS_DIR};
use yard_git::{GitRepository, Repository};

use crate::block::{Block, Level};
use crate::chooser::Chooser;
use crate::error::{Error, Result};
use crate::indexer::SourceIndexer;
use crate::metadata::{self, Metadata};
use crate::rename::{self, Rename};
use crate::title::Title;
use crate::unit::Language;
use crate::version::{Pin, VersionId};

/// Levels of directories above a canonical copy that may be pruned.
const PRUNE_LEVELS: usize = 2;

/// Prefix of the hidden directory a snapshot is built in.
const STAGING_PREFIX: &str = ".staging-";

/// What to remove when uninstalling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallTarget {
    /// One exact snapshot.
    Version(VersionId),
    /// A major pointer and every exact snapshot of that major line.
    Major(u64),
    /// Every snapshot plus the canonical copy.
    Everything,
}

/// Installed copies of blocks, rooted at one directory.
#[derive(Debug, Clone)]
pub struct InstallationCache {
    root: PathBuf,
}

impl InstallationCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every installed copy of a block.
    pub fn block_dir(&self, title: &Title) -> PathBuf {
        self.root
            .join(title.market_dir())
            .join(title.library())
            .join(title.name())
    }

    /// Canonical copy of a block.
    pub fn base_dir(&self, title: &Title) -> PathBuf {
        self.block_dir(title).join(title.name())
    }

    pub fn snapshot_dir(&self, title: &Title, pin: &Pin) -> PathBuf {
        self.block_dir(title).join(pin.to_string())
    }

    pub fn is_installed(&self, title: &Title) -> bool {
        metadata::has_marker(&self.base_dir(title))
    }

    /// Snapshots present for a block, sorted.
    pub fn installed_pins(&self, title: &Title) -> Result<Vec<Pin>> {
        let dir = self.block_dir(title);
        let mut pins = Vec::new();
        if !dir.is_dir() {
            return Ok(pins);
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(pin) = Pin::parse(&name) {
                if metadata::has_marker(&entry.path()) {
                    pins.push(pin);
                }
            }
        }
        pins.sort();
        Ok(pins)
    }

    /// Install the highest release of a working copy or market entry as the
    /// canonical copy.
    ///
    /// Returns the installed block. An already installed block is returned
    /// as is.
    pub fn install_latest(&self, source: &Block) -> Result<Block> {
        let title = source.title().clone();
        let url = match source.level() {
            Level::Download => source.path().to_string_lossy().into_owned(),
            Level::Available => {
                source
                    .metadata()
                    .remote
                    .clone()
                    .ok_or_else(|| Error::NoRepository {
                        title: title.to_string(),
                    })?
            }
            other => {
                return Err(Error::WrongLevel {
                    title: title.to_string(),
                    actual: other.to_string(),
                    expected: "download or available".to_string(),
                });
            }
        };

        let base = self.base_dir(&title);
        if metadata::has_marker(&base) {
            tracing::info!(block = %title, "already installed");
            return Block::open(&base, Level::Install);
        }

        let scratch = tempfile::TempDir::new()?;
        let export = scratch.path().join(title.name());
        GitRepository::clone_from(&url, &export)?;
        let release = Block::open(&export, Level::Temp)?;

        let latest = release
            .highest_version()?
            .filter(|v| !v.is_unreleased())
            .ok_or_else(|| Error::NoRelease {
                title: title.to_string(),
            })?;

        release.verify_release(&latest)?;
        release.require_repository()?.checkout(&latest.to_tag())?;

        if let Some(parent) = base.parent() {
            std::fs::create_dir_all(parent)?;
        }
        tree::copy_tree(&export, &base, &[])?;
        tree::set_readonly(&base, true, false)?;
        tracing::info!(block = %title, version = %latest, path = %base.display(), "installed");

        Block::open(&base, Level::Install)
    }

    /// Materialize an exact snapshot of `version` from a canonical copy and
    /// keep its major pointer current.
    ///
    /// Installing a version that is already present does nothing.
    pub fn install_version(
        &self,
        base: &Block,
        version: &VersionId,
        indexer: &dyn SourceIndexer,
    ) -> Result<Block> {
        base.expect_level(Level::Install)?;
        let title = base.title().clone();

        if !base.tagged_versions()?.contains(version) {
            return Err(Error::VersionNotFound {
                title: title.to_string(),
                version: version.to_string(),
            });
        }

        let exact = Pin::Exact(version.clone());
        let dir = self.snapshot_dir(&title, &exact);
        if metadata::has_marker(&dir) {
            tracing::info!(block = %title, version = %version, "version already installed");
            return Block::open(&dir, Level::Pinned(exact));
        }

        self.with_checkout(base, version, |cache| {
            base.verify_release(version)?;
            cache.snapshot(base, &exact, indexer)?;
            if let Err(e) = cache.update_pointer(base, version, indexer) {
                // An exact snapshot newer than its pointer must not survive.
                tree::remove_tree(&dir)?;
                return Err(e);
            }
            Ok(())
        })?;
        tracing::info!(block = %title, version = %version, "installed version");

        Block::open(&dir, Level::Pinned(exact))
    }

    /// Remove installed copies of a block after confirmation.
    ///
    /// Returns whether anything was removed.
    pub fn uninstall(
        &self,
        base: &Block,
        target: UninstallTarget,
        indexer: &dyn SourceIndexer,
        chooser: &dyn Chooser,
    ) -> Result<bool> {
        let title = base.title().clone();
        let pins = self.installed_pins(&title)?;

        let doomed: Vec<Pin> = match &target {
            UninstallTarget::Version(v) => pins
                .into_iter()
                .filter(|p| matches!(p, Pin::Exact(e) if e == v))
                .collect(),
            UninstallTarget::Major(m) => pins
                .into_iter()
                .filter(|p| match p {
                    Pin::Exact(v) => v.major() == *m,
                    Pin::Major(major) => major == m,
                })
                .collect(),
            UninstallTarget::Everything => pins,
        };

        let described = match &target {
            UninstallTarget::Version(v) => v.to_string(),
            UninstallTarget::Major(m) => format!("v{m}"),
            UninstallTarget::Everything => "every version".to_string(),
        };
        if doomed.is_empty() && target != UninstallTarget::Everything {
            return Err(Error::NotInstalled {
                title: title.to_string(),
                target: described,
            });
        }
        if !chooser.confirm(&format!("Uninstall {described} of {title}?")) {
            tracing::info!(block = %title, target = %described, "uninstall cancelled");
            return Ok(false);
        }

        if target == UninstallTarget::Everything {
            let dir = self.block_dir(&title);
            tree::remove_tree(&dir)?;
            if let Some(parent) = dir.parent() {
                tree::prune_empty_dirs(parent, &self.root, PRUNE_LEVELS)?;
            }
            tracing::info!(block = %title, "uninstalled every version");
            return Ok(true);
        }

        for pin in &doomed {
            tree::remove_tree(&self.snapshot_dir(&title, pin))?;
            tracing::info!(block = %title, snapshot = %pin, "removed snapshot");
        }
        if let UninstallTarget::Version(v) = &target {
            self.repair_pointer(base, v.major(), indexer)?;
        }
        Ok(true)
    }

    /// Run `work` with the canonical copy writable and checked out at
    /// `version`, restoring both afterwards.
    fn with_checkout<T>(
        &self,
        base: &Block,
        version: &VersionId,
        work: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let repo = base.require_repository()?;
        let head = repo.head_ref()?;
        tree::set_readonly(base.path(), false, false)?;

        let outcome = repo
            .checkout(&version.to_tag())
            .map_err(Error::from)
            .and_then(|()| work(self));

        let restored = repo.checkout(&head);
        tree::set_readonly(base.path(), true, false)?;
        let value = outcome?;
        restored?;
        Ok(value)
    }

    /// Copy the checked-out canonical tree into the directory for `pin` and
    /// suffix every unit identifier in the copy.
    ///
    /// The copy is built in a hidden staging directory and moved into place
    /// only once complete, replacing any previous snapshot for `pin`. A
    /// failed build leaves the previous snapshot, if any, untouched.
    fn snapshot(&self, base: &Block, pin: &Pin, indexer: &dyn SourceIndexer) -> Result<PathBuf> {
        let dir = self.snapshot_dir(base.title(), pin);
        let staging = self
            .block_dir(base.title())
            .join(format!("{STAGING_PREFIX}{pin}"));
        tree::remove_tree(&staging)?;

        if let Err(e) = build_snapshot(base, pin, &staging, indexer) {
            if let Err(cleanup) = tree::remove_tree(&staging) {
                tracing::warn!(path = %staging.display(), error = %cleanup, "could not remove staging directory");
            }
            return Err(e);
        }

        tree::remove_tree(&dir)?;
        std::fs::rename(&staging, &dir)?;
        tracing::debug!(block = %base.title(), snapshot = %pin, "materialized snapshot");
        Ok(dir)
    }

    /// Create the major pointer for `version`, or replace it when `version`
    /// is strictly newer. Expects the canonical copy checked out at `version`.
    fn update_pointer(
        &self,
        base: &Block,
        version: &VersionId,
        indexer: &dyn SourceIndexer,
    ) -> Result<()> {
        let pin = Pin::Major(version.major());
        let dir = self.snapshot_dir(base.title(), &pin);
        if metadata::has_marker(&dir) {
            let (current, _) = Metadata::read(&dir)?;
            if *version <= current.version {
                tracing::debug!(block = %base.title(), pointer = %pin, current = %current.version, "pointer already newer");
                return Ok(());
            }
            tracing::info!(block = %base.title(), pointer = %pin, from = %current.version, to = %version, "updating major pointer");
        }
        self.snapshot(base, &pin, indexer)?;
        Ok(())
    }

    /// Point the major pointer back at the highest remaining exact snapshot,
    /// or drop it when none is left.
    fn repair_pointer(&self, base: &Block, major: u64, indexer: &dyn SourceIndexer) -> Result<()> {
        let title = base.title();
        let pointer = Pin::Major(major);
        let highest = self
            .installed_pins(title)?
            .into_iter()
            .filter_map(|p| match p {
                Pin::Exact(v) if v.major() == major => Some(v),
                _ => None,
            })
            .max();

        let dir = self.snapshot_dir(title, &pointer);
        let current = if metadata::has_marker(&dir) {
            Some(Metadata::read(&dir)?.0.version)
        } else {
            None
        };
        if current == highest {
            return Ok(());
        }

        match highest {
            Some(version) => {
                self.with_checkout(base, &version, |cache| {
                    cache.snapshot(base, &pointer, indexer).map(|_| ())
                })?;
                tracing::info!(block = %title, pointer = major, version = %version, "major pointer moved back");
            }
            None => {
                tree::remove_tree(&dir)?;
                tracing::info!(block = %title, pointer = major, "removed empty major pointer");
            }
        }
        Ok(())
    }
}

/// Fill `staging` with a renamed, read-only copy of the checked-out
/// canonical tree.
fn build_snapshot(
    base: &Block,
    pin: &Pin,
    staging: &Path,
    indexer: &dyn SourceIndexer,
) -> Result<()> {
    tree::copy_tree(base.path(), staging, &[VCS_DIR])?;

    let mut copy = Block::open(staging, Level::Pinned(pin.clone()))?;
    let suffix = pin.identifier_suffix();
    let units = copy.units(indexer)?;
    let files = copy.source_files(indexer)?;

    for language in [Language::Vhdl, Language::Verilog] {
        let renames: Vec<Rename> = units
            .iter()
            .filter(|u| u.language == language)
            .map(|u| {
                Rename::new(
                    &u.name,
                    &format!("{}{suffix}", u.name),
                    language.case_insensitive(),
                )
            })
            .collect();
        let targets: Vec<PathBuf> = files
            .iter()
            .filter(|f| Language::from_path(f) == Some(language))
            .cloned()
            .collect();
        if !renames.is_empty() {
            rename::rename_identifiers(&renames, &targets)?;
        }
    }

    // The staging directory name must not leak into the marker.
    let meta = copy.metadata_mut();
    meta.name = base.metadata().name.clone();
    meta.library = base.metadata().library.clone();
    meta.toplevel = meta.toplevel.take().map(|t| format!("{t}{suffix}"));
    meta.bench = meta.bench.take().map(|b| format!("{b}{suffix}"));
    copy.save()?;
    tree::set_readonly(staging, true, true)?;
    tracing::debug!(block = %base.title(), snapshot = %pin, units = units.len(), "built snapshot");
    Ok(())
}
