//! List command implementation

use colored::Colorize;
use serde::Serialize;
use yard_core::{Context, Level};

use crate::error::Result;

/// One row of `yard list`.
#[derive(Debug, Serialize)]
struct BlockEntry {
    title: String,
    version: String,
    levels: Vec<String>,
    installed: Vec<String>,
    path: String,
}

/// Run the list command
pub fn run_list(ctx: &Context, json: bool) -> Result<()> {
    let mut entries = Vec::new();
    for (_, slots) in ctx.inventory.iter() {
        // Slots are ordered Download, Install, Available: the first is preferred.
        let Some(block) = slots.values().next() else {
            continue;
        };
        let installed = if slots.contains_key(&Level::Install) {
            ctx.cache
                .installed_pins(block.title())?
                .iter()
                .map(ToString::to_string)
                .collect()
        } else {
            Vec::new()
        };
        entries.push(BlockEntry {
            title: block.title().to_string(),
            version: block.version().to_string(),
            levels: slots.keys().map(ToString::to_string).collect(),
            installed,
            path: block.path().display().to_string(),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", "No blocks found".dimmed());
        println!();
        println!("Run {} to create one.", "yard init <library>.<name>".cyan());
        return Ok(());
    }

    println!("{}", "Blocks".bold());
    println!();
    for entry in &entries {
        println!(
            "  {} {} [{}]",
            entry.title.cyan(),
            entry.version.green(),
            entry.levels.join(", ").dimmed()
        );
        if !entry.installed.is_empty() {
            println!("      {} {}", "installed:".dimmed(), entry.installed.join(", "));
        }
    }
    println!();
    println!("{} block(s)", entries.len());
    Ok(())
}
