//! Remote command implementation

use colored::Colorize;
use yard_core::{Context, Level, Market};

use crate::commands::target_title;
use crate::error::{CliError, Result};

/// Run the remote command on the block in the current directory
///
/// With no arguments, prints the current remote and market.
pub fn run_remote(
    ctx: &mut Context,
    url: Option<&str>,
    unset: bool,
    market: Option<&str>,
) -> Result<()> {
    let title = target_title(ctx, None)?;
    if let Some(name) = market.filter(|m| !m.is_empty()) {
        if !ctx.markets.iter().any(|m| m.name().eq_ignore_ascii_case(name)) {
            tracing::warn!(market = name, "market is not linked to the active workspace");
        }
    }

    let block = ctx
        .inventory
        .get_mut(&title, Level::Download)
        .ok_or_else(|| CliError::user(format!("'{title}' has no working copy")))?;

    if unset {
        block.set_remote(None)?;
        println!("{} Removed remote", "OK".green().bold());
    } else if let Some(url) = url {
        block.set_remote(Some(url))?;
        println!("{} Remote set to {}", "OK".green().bold(), url.cyan());
    }
    if let Some(name) = market {
        block.bind_market(Some(name))?;
        match block.metadata().market.as_deref() {
            Some(bound) => println!("{} Bound to market {}", "OK".green().bold(), bound.cyan()),
            None => println!("{} Unbound from market", "OK".green().bold()),
        }
    }

    if url.is_none() && !unset && market.is_none() {
        let meta = block.metadata();
        println!("{}:  {}", "Remote".dimmed(), meta.remote.as_deref().unwrap_or("-"));
        println!("{}:  {}", "Market".dimmed(), meta.market.as_deref().unwrap_or("-"));
    }
    Ok(())
}
