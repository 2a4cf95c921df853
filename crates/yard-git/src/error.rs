//! Error types for yard-git

use std::path::PathBuf;

/// Result type for yard-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in yard-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] yard_fs::Error),

    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Reference '{name}' not found")]
    ReferenceNotFound { name: String },

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Fetch failed: {message}")]
    FetchFailed { message: String },

    #[error("Tag '{name}' already exists")]
    TagExists { name: String },

    #[error("Path {path} is outside the repository at {root}")]
    OutsideRepository { path: PathBuf, root: PathBuf },
}
