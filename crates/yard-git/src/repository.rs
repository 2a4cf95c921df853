//! Repository trait for version-control operations

use std::path::Path;

use crate::Result;

/// Trait for the version-control primitives a block needs.
///
/// Implementations own one working tree. Every method operates on that tree;
/// none of them prompt or retry.
pub trait Repository {
    /// Root of the working tree.
    fn root(&self) -> &Path;

    /// Names of every tag in the repository, unfiltered.
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Check out a tag, branch or commit, replacing the working tree contents.
    fn checkout(&self, reference: &str) -> Result<()>;

    /// The reference to pass to [`Repository::checkout`] to return to the
    /// current state: the branch name, or the commit id when detached.
    fn head_ref(&self) -> Result<String>;

    /// Stage specific paths (relative to the root or absolute inside it).
    fn add(&self, paths: &[&Path]) -> Result<()>;

    /// Stage every modified, deleted and untracked file.
    fn add_all(&self) -> Result<()>;

    /// Commit the staged index on the current branch.
    fn commit(&self, message: &str) -> Result<()>;

    /// Create a lightweight tag at HEAD.
    fn create_tag(&self, name: &str) -> Result<()>;

    /// Push the current branch and all tags to `origin`.
    fn push(&self) -> Result<()>;

    /// URL of the `origin` remote, if configured.
    fn remote_url(&self) -> Result<Option<String>>;

    /// Set (or with `None`, remove) the `origin` remote.
    fn set_remote_url(&self, url: Option<&str>) -> Result<()>;

    /// Whether the local branch is not behind its remote counterpart.
    ///
    /// A repository without a remote is always up to date.
    fn is_up_to_date(&self) -> Result<bool>;
}
