//! Info command implementation

use colored::Colorize;
use yard_core::Context;

use crate::commands::target_title;
use crate::error::{CliError, Result};

/// Run the info command
pub fn run_info(ctx: &Context, title: Option<&str>) -> Result<()> {
    let title = target_title(ctx, title)?;
    let block = ctx
        .inventory
        .preferred(&title)
        .ok_or_else(|| CliError::user(format!("block '{title}' is not known")))?;
    let meta = block.metadata();

    println!("{}", block.title().to_string().bold());
    println!();
    println!("{}:  {}", "Version".dimmed(), meta.version.to_string().green());
    println!("{}:    {}", "Level".dimmed(), block.level());
    println!("{}:     {}", "Path".dimmed(), block.path().display());
    if let Some(summary) = &meta.summary {
        println!("{}:  {}", "Summary".dimmed(), summary);
    }
    println!("{}:   {}", "Remote".dimmed(), meta.remote.as_deref().unwrap_or("-"));
    println!("{}:   {}", "Market".dimmed(), meta.market.as_deref().unwrap_or("-"));
    println!("{}:      {}", "Top".dimmed(), meta.toplevel.as_deref().unwrap_or("-"));
    println!("{}:    {}", "Bench".dimmed(), meta.bench.as_deref().unwrap_or("-"));
    println!();

    println!("{}:", "Derives".bold());
    if meta.derives.is_empty() {
        println!("  {}", "None".dimmed());
    } else {
        for entry in &meta.derives {
            println!("  {} {}", "+".green(), entry.cyan());
        }
    }
    println!();

    if block.repository().is_some() {
        let versions = block.tagged_versions()?;
        println!("{}:", "Releases".bold());
        if versions.is_empty() {
            println!("  {}", "None".dimmed());
        } else {
            for version in versions.iter().rev() {
                println!("  {}", version);
            }
        }
        println!();
    }

    let pins = ctx.cache.installed_pins(block.title())?;
    println!("{}:", "Installed".bold());
    if pins.is_empty() {
        println!("  {} (use {} to install)", "None".dimmed(), "yard install".cyan());
    } else {
        for pin in pins {
            println!("  {} {}", "+".green(), pin);
        }
    }
    Ok(())
}
