//! Command implementations for yard-cli

pub mod download;
pub mod graph;
pub mod info;
pub mod init;
pub mod install;
pub mod list;
pub mod release;
pub mod remote;
pub mod uninstall;
pub mod workspace;

pub use download::run_download;
pub use graph::run_graph;
pub use info::run_info;
pub use init::run_init;
pub use install::run_install;
pub use list::run_list;
pub use release::run_release;
pub use remote::run_remote;
pub use uninstall::run_uninstall;
pub use workspace::{run_market, run_workspace};

use yard_core::{Context, Title};

use crate::error::Result;

/// The named block, or the working copy containing the current directory.
pub(crate) fn target_title(ctx: &Context, title: Option<&str>) -> Result<Title> {
    match title {
        Some(text) => Ok(Title::parse(text)?),
        None => Ok(ctx.block_at(&std::env::current_dir()?)?),
    }
}
