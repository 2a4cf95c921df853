//! Install command implementation

use colored::Colorize;
use yard_core::{Context, Outcome, Requirement};

use crate::commands::target_title;
use crate::error::{CliError, Result};

/// Run the install command
///
/// With a requirement, installs that block and everything it derives.
/// Without one, installs the dependencies of the block in the current
/// directory.
pub fn run_install(ctx: &mut Context, requirement: Option<&str>) -> Result<()> {
    let outcomes = match requirement {
        Some(text) => {
            let requirement = Requirement::parse(text)?;
            ctx.install(&requirement)?
        }
        None => {
            let title = target_title(ctx, None)?;
            ctx.install_dependencies(&title)?
        }
    };

    if outcomes.is_empty() {
        println!("{}", "Nothing to install".dimmed());
        return Ok(());
    }

    let mut skipped = 0;
    for outcome in &outcomes {
        match outcome {
            Outcome::Installed(req) => {
                println!("  {} {}", "+".green(), req.to_string().cyan());
            }
            Outcome::Skipped {
                requirement,
                reason,
            } => {
                skipped += 1;
                println!(
                    "  {} {} ({})",
                    "!".yellow(),
                    requirement.to_string().cyan(),
                    reason.yellow()
                );
            }
        }
    }

    if skipped > 0 {
        return Err(CliError::user(format!(
            "{skipped} requirement(s) could not be installed"
        )));
    }
    Ok(())
}
