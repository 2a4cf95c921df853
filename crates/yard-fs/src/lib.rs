//! Filesystem helpers for Blockyard
//!
//! Provides atomic I/O, format-agnostic config loading and the directory
//! tree operations the installation cache is built on.

pub mod config;
pub mod error;
pub mod io;
pub mod tree;

pub use config::ConfigStore;
pub use error::{Error, Result};
