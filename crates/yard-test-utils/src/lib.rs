//! Shared test utilities for the Blockyard workspace.
//!
//! Dev-dependency only. Fixtures write marker files as raw TOML so this crate
//! does not depend on the crates it helps test.
//!
//! # Modules
//!
//! - [`git`]: git repository fixtures backed by `git2`
//! - [`block`]: [`TestBlock`](block::TestBlock) builder for block repositories

pub mod block;
pub mod git;

pub use block::{MARKER, TAG_SUFFIX, TestBlock};
pub use git::{add_origin, bare_remote, commit_all, init_repo, tag};
