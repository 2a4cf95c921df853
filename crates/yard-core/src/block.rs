//! A block: one HDL project at one lifecycle level.

use std::fmt;
use std::path::{Path, PathBuf};

use yard_git::{GitRepository, Repository};

use crate::error::{Error, Result};
use crate::indexer::SourceIndexer;
use crate::market::CHANGELOG;
use crate::metadata::{self, MARKER, Metadata};
use crate::title::{Requirement, Title};
use crate::unit::Unit;
use crate::version::{self, Pin, VersionId};

/// Where a block lives. Fixed when the block is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    /// A working copy in the active workspace.
    Download,
    /// The canonical copy in the installation cache.
    Install,
    /// An entry published in a linked market.
    Available,
    /// A read-only snapshot of one release or major line.
    Pinned(Pin),
    /// A scratch export that is discarded after use.
    Temp,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Download => f.write_str("download"),
            Level::Install => f.write_str("install"),
            Level::Available => f.write_str("available"),
            Level::Pinned(pin) => write!(f, "pinned {pin}"),
            Level::Temp => f.write_str("temp"),
        }
    }
}

/// A block loaded from its marker file.
pub struct Block {
    path: PathBuf,
    level: Level,
    meta: Metadata,
    /// Metadata as last read from or written to disk.
    stored: Metadata,
    /// Whether the marker on disk carried every key.
    complete: bool,
    title: Title,
    repo: Option<Box<dyn Repository>>,
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("title", &self.title)
            .field("level", &self.level)
            .field("path", &self.path)
            .field("version", &self.meta.version)
            .field("has_repository", &self.repo.is_some())
            .finish()
    }
}

impl Block {
    /// Load the block whose marker lives in `path`.
    ///
    /// Working copies, canonical cache copies and scratch exports get their
    /// git repository attached when one exists.
    pub fn open(path: &Path, level: Level) -> Result<Self> {
        if !metadata::has_marker(path) {
            return Err(Error::BlockNotFound {
                title: path.display().to_string(),
            });
        }
        let (meta, complete) = Metadata::read(path)?;
        let repo = match level {
            Level::Download | Level::Install | Level::Temp => GitRepository::discover(path)
                .map(|r| Box::new(r) as Box<dyn Repository>),
            Level::Available | Level::Pinned(_) => None,
        };
        Ok(Self::secure(path, level, meta, complete, repo))
    }

    /// Fill in missing identity from the directory layout and cache the title.
    fn secure(
        path: &Path,
        level: Level,
        mut meta: Metadata,
        complete: bool,
        repo: Option<Box<dyn Repository>>,
    ) -> Self {
        let stored = meta.clone();
        let dir_name = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        if meta.name.is_none() {
            meta.name = Some(dir_name(Some(path)));
        }
        if meta.library.is_none() {
            meta.library = Some(dir_name(path.parent()));
        }
        let title = Title::new(
            meta.market.as_deref(),
            meta.library.as_deref().unwrap_or_default(),
            meta.name.as_deref().unwrap_or_default(),
        );
        Self {
            path: path.to_path_buf(),
            level,
            meta,
            stored,
            complete,
            title,
            repo,
        }
    }

    /// Create a new block at `path` with a fresh marker at `v0.0.0`.
    ///
    /// Initializes a git repository and, when `remote` is given, sets it as
    /// `origin`. The remote must not already hold any refs.
    pub fn init(path: &Path, title: &Title, remote: Option<&str>) -> Result<Self> {
        if metadata::has_marker(path) {
            return Err(Error::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(url) = remote {
            if yard_git::remote_has_refs(url)? {
                return Err(Error::RemoteNotEmpty {
                    url: url.to_string(),
                });
            }
        }

        std::fs::create_dir_all(path)?;
        let meta = Metadata {
            name: Some(title.name().to_string()),
            library: Some(title.library().to_string()),
            market: title.market().map(str::to_string),
            remote: remote.map(str::to_string),
            ..Default::default()
        };
        meta.write(path)?;

        let repo = GitRepository::init(path)?;
        if remote.is_some() {
            repo.set_remote_url(remote)?;
        }
        repo.add_all()?;
        repo.commit("Initializes block")?;
        tracing::info!(block = %title, path = %path.display(), "initialized block");

        Ok(Self::secure(path, Level::Download, meta, true, Some(Box::new(repo))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn title(&self) -> &Title {
        &self.title
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    pub fn version(&self) -> &VersionId {
        &self.meta.version
    }

    pub fn repository(&self) -> Option<&dyn Repository> {
        self.repo.as_deref()
    }

    pub(crate) fn require_repository(&self) -> Result<&dyn Repository> {
        self.repo.as_deref().ok_or_else(|| Error::NoRepository {
            title: self.title.to_string(),
        })
    }

    pub(crate) fn expect_level(&self, expected: Level) -> Result<()> {
        if self.level == expected {
            Ok(())
        } else {
            Err(Error::WrongLevel {
                title: self.title.to_string(),
                actual: self.level.to_string(),
                expected: expected.to_string(),
            })
        }
    }

    /// Parsed `derives` entries.
    pub fn requirements(&self) -> Vec<Requirement> {
        self.meta.requirements()
    }

    /// Write the marker if the metadata changed or the marker was incomplete.
    ///
    /// Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool> {
        if self.complete && self.meta == self.stored {
            tracing::trace!(block = %self.title, "marker unchanged, skipping save");
            return Ok(false);
        }
        self.meta.write(&self.path)?;
        self.stored = self.meta.clone();
        self.complete = true;
        tracing::debug!(block = %self.title, path = %self.path.display(), "saved marker");
        Ok(true)
    }

    /// Released versions found in the repository's tags, highest first.
    pub fn tagged_versions(&self) -> Result<Vec<VersionId>> {
        let repo = self.require_repository()?;
        let versions = repo
            .list_tags()?
            .iter()
            .filter_map(|tag| VersionId::from_tag(tag))
            .collect();
        Ok(version::sort_versions(versions))
    }

    /// Highest released version, if any.
    pub fn highest_version(&self) -> Result<Option<VersionId>> {
        Ok(self.tagged_versions()?.into_iter().next())
    }

    /// Fail with [`Error::CorruptRelease`] unless the release tagged
    /// `version` is usable.
    ///
    /// A release is corrupt when its tree has no marker, the marker cannot be
    /// read, or the marker records a different version than the tag. The
    /// working tree is returned to its current ref afterwards.
    pub fn verify_release(&self, version: &VersionId) -> Result<()> {
        let repo = self.require_repository()?;
        let head = repo.head_ref()?;
        repo.checkout(&version.to_tag())?;

        let reason = if !metadata::has_marker(&self.path) {
            Some(format!("no {MARKER} at this release"))
        } else {
            match Metadata::read(&self.path) {
                Ok((meta, _)) if meta.version == *version => None,
                Ok((meta, _)) => Some(format!("marker records {}", meta.version)),
                Err(e) => Some(e.to_string()),
            }
        };

        repo.checkout(&head)?;
        match reason {
            None => Ok(()),
            Some(reason) => {
                tracing::warn!(block = %self.title, version = %version, reason, "corrupt release");
                Err(Error::CorruptRelease {
                    title: self.title.to_string(),
                    version: version.to_string(),
                    reason,
                })
            }
        }
    }

    /// Set or clear the `origin` remote and record it in the marker.
    pub fn set_remote(&mut self, url: Option<&str>) -> Result<()> {
        self.require_repository()?.set_remote_url(url)?;
        self.meta.remote = url.map(str::to_string);
        self.save()?;
        Ok(())
    }

    /// Bind the block to a market, or unbind it with `None`.
    pub fn bind_market(&mut self, market: Option<&str>) -> Result<()> {
        self.meta.market = market.filter(|m| !m.is_empty()).map(str::to_string);
        self.title = self.title.with_market(self.meta.market.as_deref());
        self.save()?;
        Ok(())
    }

    pub fn changelog_path(&self) -> PathBuf {
        self.path.join(CHANGELOG)
    }

    /// Contents of the block's changelog, if it has one.
    pub fn changelog(&self) -> Result<Option<String>> {
        let path = self.changelog_path();
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(yard_fs::io::read_text(&path)?))
    }

    /// Source files the indexer understands, sorted.
    pub fn source_files(&self, indexer: &dyn SourceIndexer) -> Result<Vec<PathBuf>> {
        let extensions = indexer.extensions();
        Ok(yard_fs::tree::list_files(&self.path, &extensions)?)
    }

    /// Every design unit in the block with its requirements decoded.
    pub fn units(&self, indexer: &dyn SourceIndexer) -> Result<Vec<Unit>> {
        let files = self.source_files(indexer)?;
        indexer
            .scan(&files)?
            .into_iter()
            .map(|stub| {
                let requires = indexer.decode(&stub)?;
                Ok(Unit::from_stub(&self.title, stub, requires))
            })
            .collect()
    }
}
