//! Download command implementation

use colored::Colorize;
use yard_core::{Context, Title};

use crate::error::Result;

/// Run the download command
pub fn run_download(ctx: &mut Context, title: &str) -> Result<()> {
    let title = Title::parse(title)?;
    let path = ctx.download(&title)?;

    println!(
        "{} Downloaded {} to {}",
        "OK".green().bold(),
        title.to_string().cyan(),
        path.display()
    );
    Ok(())
}
