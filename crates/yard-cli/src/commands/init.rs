//! Init command implementation

use colored::Colorize;
use yard_core::{Context, Title};

use crate::error::Result;

/// Run the init command
pub fn run_init(ctx: &mut Context, title: &str, remote: Option<&str>) -> Result<()> {
    let title = Title::parse(title)?;
    let path = ctx.init_block(&title, remote)?;

    println!(
        "{} Initialized block {} at {}",
        "OK".green().bold(),
        title.to_string().cyan(),
        path.display()
    );
    if remote.is_none() {
        println!(
            "  {} (use {} to add one)",
            "No remote".dimmed(),
            "yard remote <url>".cyan()
        );
    }
    Ok(())
}
