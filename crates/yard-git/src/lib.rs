//! Version-control abstraction for Blockyard
//!
//! Blocks talk to their history through the [`Repository`] trait; the
//! [`GitRepository`] implementation backs it with `git2`.

pub mod error;
pub mod git;
pub mod repository;

pub use error::{Error, Result};
pub use git::{GitRepository, remote_has_refs};
pub use repository::Repository;
