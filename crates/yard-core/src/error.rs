//! Error types for yard-core

use std::path::PathBuf;

/// Result type for yard-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`], used to decide how a command reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed version or title string.
    Validation,
    /// Missing block, version or unit.
    NotFound,
    /// The on-disk or repository state forbids the operation.
    State,
    /// Two things claim the same slot or name.
    Conflict,
    /// Filesystem or version-control failure.
    Io,
}

/// Errors that can occur in yard-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid version '{text}'")]
    InvalidVersion { text: String },

    #[error("invalid block title '{text}': {reason}")]
    InvalidTitle { text: String, reason: String },

    #[error("version {requested} must be greater than the latest release {latest}")]
    VersionNotGreater { requested: String, latest: String },

    #[error("block '{title}' not found")]
    BlockNotFound { title: String },

    #[error("version {version} of '{title}' does not exist")]
    VersionNotFound { title: String, version: String },

    #[error("design unit '{name}' not found")]
    UnitNotFound { name: String },

    #[error("block '{title}' has no valid release")]
    NoRelease { title: String },

    #[error("release {version} of '{title}' is corrupt: {reason}")]
    CorruptRelease {
        title: String,
        version: String,
        reason: String,
    },

    #[error("block '{title}' is not synchronized with its remote")]
    NotSynchronized { title: String },

    #[error("remote {url} already holds a repository")]
    RemoteNotEmpty { url: String },

    #[error("'{title}' has nothing installed for {target}")]
    NotInstalled { title: String, target: String },

    #[error("'{title}' is a {actual} block; this operation needs {expected}")]
    WrongLevel {
        title: String,
        actual: String,
        expected: String,
    },

    #[error("block '{title}' has no repository")]
    NoRepository { title: String },

    #[error("dependency cycle among: {}", participants.join(", "))]
    DependencyCycle { participants: Vec<String> },

    #[error("'{title}' already occupies the {level} slot")]
    SlotOccupied { title: String, level: String },

    #[error("renaming '{from}' to '{to}' collides with an existing identifier")]
    NameCollision { from: String, to: String },

    #[error("a block already exists at {path}")]
    AlreadyExists { path: PathBuf },

    #[error("failed to parse marker file {path}: {message}")]
    MarkerParse { path: PathBuf, message: String },

    #[error("failed to serialize marker file {path}: {message}")]
    MarkerSerialize { path: PathBuf, message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("Filesystem error: {0}")]
    Fs(#[from] yard_fs::Error),

    #[error("Git error: {0}")]
    Git(#[from] yard_git::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidVersion { .. }
            | Error::InvalidTitle { .. }
            | Error::VersionNotGreater { .. } => ErrorKind::Validation,
            Error::BlockNotFound { .. }
            | Error::VersionNotFound { .. }
            | Error::UnitNotFound { .. }
            | Error::NoRelease { .. } => ErrorKind::NotFound,
            Error::CorruptRelease { .. }
            | Error::NotSynchronized { .. }
            | Error::RemoteNotEmpty { .. }
            | Error::NotInstalled { .. }
            | Error::WrongLevel { .. }
            | Error::NoRepository { .. }
            | Error::DependencyCycle { .. } => ErrorKind::State,
            Error::SlotOccupied { .. }
            | Error::NameCollision { .. }
            | Error::AlreadyExists { .. } => ErrorKind::Conflict,
            Error::MarkerParse { .. }
            | Error::MarkerSerialize { .. }
            | Error::Config { .. }
            | Error::Fs(_)
            | Error::Git(_)
            | Error::Io(_)
            | Error::Pattern(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        let corrupt = Error::CorruptRelease {
            title: "math.adder".into(),
            version: "v1.0.0".into(),
            reason: "marker says v0.9.0".into(),
        };
        assert_eq!(corrupt.kind(), ErrorKind::State);
        assert_eq!(
            Error::InvalidVersion { text: "1.x".into() }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::SlotOccupied {
                title: "math.adder".into(),
                level: "download".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
    }

    #[test]
    fn test_cycle_message_lists_participants() {
        let err = Error::DependencyCycle {
            participants: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "dependency cycle among: a, b");
    }
}
