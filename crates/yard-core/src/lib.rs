//! Core of Blockyard, a package manager for HDL blocks.
//!
//! A block is a directory holding a `Block.toml` marker and a git history
//! whose release tags carry a [`VersionId`](version::VersionId). This crate
//! models blocks and their releases, tracks every known block in an
//! [`Inventory`], installs releases into the [`InstallationCache`] so several
//! versions coexist, and orders design units for building.
//!
//! Interaction with the outside world goes through traits: [`Chooser`] for
//! prompts, [`SourceIndexer`] for reading HDL sources, [`Market`] for
//! publishing and `yard_git::Repository` for history.

pub mod block;
pub mod cache;
pub mod chooser;
pub mod config;
pub mod context;
pub mod detect;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod inventory;
pub mod market;
pub mod metadata;
pub mod release;
pub mod rename;
pub mod resolver;
pub mod title;
pub mod unit;
pub mod version;

pub use block::{Block, Level};
pub use cache::{InstallationCache, UninstallTarget};
pub use chooser::{AutoChooser, Chooser, ScriptedChooser};
pub use config::Settings;
pub use context::{Context, Roles};
pub use error::{Error, ErrorKind, Result};
pub use graph::{BuildOrder, UnitGraph};
pub use indexer::{DeclarationScanner, SourceIndexer};
pub use inventory::Inventory;
pub use market::{DirectoryMarket, Market};
pub use metadata::{MARKER, Metadata};
pub use release::{NextVersion, ReleaseRequest};
pub use resolver::{DependencyResolver, Outcome};
pub use title::{Requirement, Title};
pub use unit::{Language, Unit, UnitKind};
pub use version::{Bump, Pin, VersionId};
