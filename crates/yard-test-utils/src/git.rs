//! Git repository fixtures.
//!
//! All fixtures use `git2` directly and configure a local identity, so they
//! work on machines without a global git config.

use std::path::Path;

use git2::{IndexAddOption, Repository, Signature};

/// Initialises a repository with a local user identity and no commits.
///
/// # Panics
/// Panics if `git2` fails.
pub fn init_repo(path: &Path) -> Repository {
    let repo = Repository::init(path)
        .unwrap_or_else(|e| panic!("init_repo: failed at {}: {e}", path.display()));
    {
        let mut config = repo
            .config()
            .unwrap_or_else(|e| panic!("init_repo: no config: {e}"));
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@test.com").unwrap();
    }
    repo
}

/// Initialises a bare repository usable as a push target.
pub fn bare_remote(path: &Path) -> Repository {
    Repository::init_bare(path)
        .unwrap_or_else(|e| panic!("bare_remote: failed at {}: {e}", path.display()))
}

/// Stages every change in the working tree and commits it on HEAD.
pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index.add_all(["*"], IndexAddOption::DEFAULT, None).unwrap();
    index.update_all(["*"], None).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Test User", "test@test.com").unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap_or_else(|e| panic!("commit_all: {e}"));
}

/// Creates a lightweight tag at HEAD.
pub fn tag(repo: &Repository, name: &str) {
    let head = repo.head().unwrap().peel(git2::ObjectType::Commit).unwrap();
    repo.tag_lightweight(name, &head, false)
        .unwrap_or_else(|e| panic!("tag: failed to create {name}: {e}"));
}

/// Adds `origin` pointing at `url`.
pub fn add_origin(repo: &Repository, url: &str) {
    repo.remote("origin", url)
        .unwrap_or_else(|e| panic!("add_origin: {e}"));
}
