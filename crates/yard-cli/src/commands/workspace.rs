//! Workspace and market settings commands
//!
//! These edit `settings.toml` directly and run without loading the
//! inventory, so a broken active workspace can still be repaired.

use std::path::Path;

use colored::Colorize;
use yard_core::Settings;

use crate::cli::{MarketAction, WorkspaceAction};
use crate::error::Result;

/// Run a workspace action and save the settings
pub fn run_workspace(settings: &mut Settings, action: WorkspaceAction) -> Result<()> {
    match action {
        WorkspaceAction::List => {
            list_workspaces(settings);
            return Ok(());
        }
        WorkspaceAction::Add {
            name,
            path,
            activate,
        } => {
            let path = prepare_dir(&path)?;
            settings.add_workspace(&name, &path)?;
            if activate {
                settings.activate_workspace(&name)?;
            }
            println!(
                "{} Added workspace {} at {}",
                "OK".green().bold(),
                name.cyan(),
                path.display()
            );
        }
        WorkspaceAction::Use { name } => {
            settings.activate_workspace(&name)?;
            println!("{} Active workspace is now {}", "OK".green().bold(), name.cyan());
        }
    }
    settings.save()?;
    Ok(())
}

/// Run a market action and save the settings
pub fn run_market(settings: &mut Settings, action: MarketAction) -> Result<()> {
    match action {
        MarketAction::Add { name, path, link } => {
            let path = prepare_dir(&path)?;
            settings.add_market(&name, &path);
            println!(
                "{} Registered market {} at {}",
                "OK".green().bold(),
                name.cyan(),
                path.display()
            );
            if link {
                settings.link_market(&name)?;
                println!("{} Linked {} to the active workspace", "OK".green().bold(), name.cyan());
            }
        }
        MarketAction::Link { name } => {
            if settings.link_market(&name)? {
                println!("{} Linked {} to the active workspace", "OK".green().bold(), name.cyan());
            } else {
                println!("{}", format!("{name} is already linked").dimmed());
            }
        }
        MarketAction::Unlink { name } => {
            if settings.unlink_market(&name)? {
                println!("{} Unlinked {}", "OK".green().bold(), name.cyan());
            } else {
                println!("{}", format!("{name} was not linked").dimmed());
            }
        }
    }
    settings.save()?;
    Ok(())
}

fn list_workspaces(settings: &Settings) {
    let active = settings.active().ok().map(|(name, _)| name.to_string());
    println!("{}", "Workspaces".bold());
    println!();
    for (name, ws) in &settings.workspaces {
        let marker = if active.as_deref() == Some(name.as_str()) { "*" } else { " " };
        println!("  {} {} {}", marker.green(), name.cyan(), ws.path.display());
        if !ws.markets.is_empty() {
            println!("      {} {}", "markets:".dimmed(), ws.markets.join(", "));
        }
    }
}

/// Absolute form of `path`, created when missing.
fn prepare_dir(path: &Path) -> Result<std::path::PathBuf> {
    let path = std::path::absolute(path)?;
    if !path.is_dir() {
        tracing::info!(path = %path.display(), "creating directory");
        std::fs::create_dir_all(&path)?;
    }
    Ok(path)
}
