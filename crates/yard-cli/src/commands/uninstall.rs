//! Uninstall command implementation

use colored::Colorize;
use yard_core::version::Arity;
use yard_core::{Context, Title, UninstallTarget, VersionId};

use crate::error::{CliError, Result};

/// Run the uninstall command
pub fn run_uninstall(
    ctx: &mut Context,
    title: &str,
    version: Option<&str>,
    major: Option<u64>,
) -> Result<()> {
    let title = Title::parse(title)?;
    let target = uninstall_target(version, major)?;
    let what = match &target {
        UninstallTarget::Version(v) => format!("{title} {v}"),
        UninstallTarget::Major(m) => format!("{title} v{m}"),
        UninstallTarget::Everything => title.to_string(),
    };

    if ctx.uninstall(&title, target)? {
        println!("{} Uninstalled {}", "OK".green().bold(), what.cyan());
    } else {
        println!("{}", "Nothing removed".dimmed());
    }
    Ok(())
}

fn uninstall_target(version: Option<&str>, major: Option<u64>) -> Result<UninstallTarget> {
    match (version, major) {
        (Some(text), _) => {
            if !VersionId::validate(text, &[Arity::Full]) {
                return Err(CliError::user(format!("'{text}' is not a version like v1.2.3")));
            }
            Ok(UninstallTarget::Version(VersionId::parse(text)))
        }
        (None, Some(major)) => Ok(UninstallTarget::Major(major)),
        (None, None) => Ok(UninstallTarget::Everything),
    }
}
