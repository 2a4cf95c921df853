//! `git2`-backed implementation of [`Repository`]

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Direction, ErrorCode, IndexAddOption, ObjectType, Signature};

use crate::{Error, Repository, Result};

const ORIGIN: &str = "origin";

/// A working tree managed through `git2`.
pub struct GitRepository {
    root: PathBuf,
    repo: git2::Repository,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("root", &self.root)
            .finish()
    }
}

impl GitRepository {
    /// Open the repository whose working tree is exactly `path`.
    ///
    /// Parent directories are not searched, so a block nested inside some
    /// other repository is not mistaken for it.
    pub fn open(path: &Path) -> Result<Self> {
        let repo = git2::Repository::open(path).map_err(|_| Error::NotARepository {
            path: path.to_path_buf(),
        })?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());
        Ok(Self { root, repo })
    }

    /// Open the repository at `path` if it has a `.git` directory.
    pub fn discover(path: &Path) -> Option<Self> {
        if !path.join(".git").exists() {
            return None;
        }
        match Self::open(path) {
            Ok(repo) => Some(repo),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable repository");
                None
            }
        }
    }

    /// Initialize a new repository at `path`.
    pub fn init(path: &Path) -> Result<Self> {
        let repo = git2::Repository::init(path)?;
        Ok(Self {
            root: path.to_path_buf(),
            repo,
        })
    }

    /// Clone `source` (a URL or local path) into `dest`.
    pub fn clone_from(source: &str, dest: &Path) -> Result<Self> {
        tracing::debug!(source, dest = %dest.display(), "cloning repository");
        let repo = git2::Repository::clone(source, dest).map_err(|e| Error::FetchFailed {
            message: format!("clone of {source} failed: {}", e.message()),
        })?;
        Ok(Self {
            root: dest.to_path_buf(),
            repo,
        })
    }

    /// Put a detached HEAD on a new local branch `name` at the same commit.
    ///
    /// Clones of a repository whose HEAD is detached start out detached too;
    /// commits need a branch to land on. A HEAD already on a branch is left
    /// alone.
    pub fn attach_head(&self, name: &str) -> Result<()> {
        if self.current_branch()?.is_some() {
            return Ok(());
        }
        let commit = self.repo.head()?.peel_to_commit()?;
        self.repo.branch(name, &commit, false)?;
        self.repo.set_head(&format!("refs/heads/{name}"))?;
        tracing::debug!(branch = name, commit = %commit.id(), "attached detached HEAD");
        Ok(())
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(sig) => Ok(sig),
            Err(_) => Ok(Signature::now("blockyard", "blockyard@localhost")?),
        }
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if head.is_branch() {
            Ok(head.shorthand().ok().map(str::to_string))
        } else {
            Ok(None)
        }
    }

    fn relative<'a>(&self, path: &'a Path) -> Result<&'a Path> {
        if path.is_relative() {
            return Ok(path);
        }
        path.strip_prefix(&self.root)
            .map_err(|_| Error::OutsideRepository {
                path: path.to_path_buf(),
                root: self.root.clone(),
            })
    }
}

impl Repository for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_tags(&self) -> Result<Vec<String>> {
        let names = self.repo.tag_names(None)?;
        Ok(names.iter().flatten().flatten().map(str::to_string).collect())
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        let (object, found) =
            self.repo
                .revparse_ext(reference)
                .map_err(|_| Error::ReferenceNotFound {
                    name: reference.to_string(),
                })?;

        let mut builder = CheckoutBuilder::new();
        builder.force();
        self.repo.checkout_tree(&object, Some(&mut builder))?;

        match found {
            Some(r) if r.is_branch() => {
                let name = r.name().ok().ok_or_else(|| Error::ReferenceNotFound {
                    name: reference.to_string(),
                })?;
                self.repo.set_head(name)?;
            }
            _ => {
                let commit = object.peel_to_commit()?;
                self.repo.set_head_detached(commit.id())?;
            }
        }

        tracing::debug!(root = %self.root.display(), reference, "checked out");
        Ok(())
    }

    fn head_ref(&self) -> Result<String> {
        if let Some(branch) = self.current_branch()? {
            return Ok(branch);
        }
        let commit = self.repo.head()?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn add(&self, paths: &[&Path]) -> Result<()> {
        let mut index = self.repo.index()?;
        for path in paths {
            index.add_path(self.relative(path)?)?;
        }
        index.write()?;
        Ok(())
    }

    fn add_all(&self) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let signature = self.signature()?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(())
    }

    fn create_tag(&self, name: &str) -> Result<()> {
        if self.list_tags()?.iter().any(|t| t == name) {
            return Err(Error::TagExists {
                name: name.to_string(),
            });
        }
        let target = self.repo.head()?.peel(ObjectType::Commit)?;
        self.repo.tag_lightweight(name, &target, false)?;
        Ok(())
    }

    fn push(&self) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(ORIGIN)
            .map_err(|_| Error::RemoteNotFound {
                name: ORIGIN.to_string(),
            })?;

        let mut refspecs = Vec::new();
        if let Some(branch) = self.current_branch()? {
            refspecs.push(format!("refs/heads/{branch}:refs/heads/{branch}"));
        }
        for tag in self.list_tags()? {
            refspecs.push(format!("refs/tags/{tag}:refs/tags/{tag}"));
        }
        let refspecs: Vec<&str> = refspecs.iter().map(String::as_str).collect();

        remote
            .push(&refspecs, None)
            .map_err(|e| Error::PushFailed {
                message: e.message().to_string(),
            })?;
        Ok(())
    }

    fn remote_url(&self) -> Result<Option<String>> {
        match self.repo.find_remote(ORIGIN) {
            Ok(remote) => Ok(remote.url().ok().map(str::to_string)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_remote_url(&self, url: Option<&str>) -> Result<()> {
        let exists = self.remote_url()?.is_some();
        match (url, exists) {
            (Some(url), true) => self.repo.remote_set_url(ORIGIN, url)?,
            (Some(url), false) => {
                self.repo.remote(ORIGIN, url)?;
            }
            (None, true) => self.repo.remote_delete(ORIGIN)?,
            (None, false) => {}
        }
        Ok(())
    }

    fn is_up_to_date(&self) -> Result<bool> {
        let mut remote = match self.repo.find_remote(ORIGIN) {
            Ok(remote) => remote,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };

        remote
            .fetch(&[] as &[&str], None, None)
            .map_err(|e| Error::FetchFailed {
                message: e.message().to_string(),
            })?;

        let Some(branch) = self.current_branch()? else {
            return Ok(true);
        };
        let upstream = match self
            .repo
            .find_reference(&format!("refs/remotes/{ORIGIN}/{branch}"))
        {
            Ok(r) => r.peel_to_commit()?.id(),
            // never pushed: nothing on the remote to be behind of
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        let local = self.repo.head()?.peel_to_commit()?.id();

        let (_ahead, behind) = self.repo.graph_ahead_behind(local, upstream)?;
        Ok(behind == 0)
    }
}

/// Whether the repository at `url` already has any references.
pub fn remote_has_refs(url: &str) -> Result<bool> {
    let mut remote = git2::Remote::create_detached(url)?;
    remote
        .connect(Direction::Fetch)
        .map_err(|e| Error::FetchFailed {
            message: e.message().to_string(),
        })?;
    let has_refs = !remote.list()?.is_empty();
    remote.disconnect()?;
    Ok(has_refs)
}
