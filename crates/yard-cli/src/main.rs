//! Blockyard CLI
//!
//! The command-line interface for managing HDL blocks.

mod cli;
mod commands;
mod error;
mod interactive;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use yard_core::{Context, Settings};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        // No command provided - show help hint
        println!("{} Blockyard CLI", "yard".green().bold());
        println!();
        println!("Run {} for available commands.", "yard --help".cyan());
        return Ok(());
    };

    if let Commands::Completions { shell } = &command {
        clap_complete::generate(*shell, &mut Cli::command(), "yard", &mut std::io::stdout());
        return Ok(());
    }

    let home = match cli.home {
        Some(home) => home,
        None => Settings::default_home()?,
    };
    tracing::debug!(home = %home.display(), "loading settings");
    match command {
        Commands::Workspace { action } => {
            commands::run_workspace(&mut Settings::load(&home)?, action)
        }
        Commands::Market { action } => commands::run_market(&mut Settings::load(&home)?, action),
        command => {
            let mut ctx = Context::load(&home, interactive::chooser(cli.yes))?;
            execute_command(&mut ctx, command)
        }
    }
}

/// Log to stderr at INFO, or DEBUG with `--verbose`; `RUST_LOG` wins over both.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute_command(ctx: &mut Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init { title, remote } => commands::run_init(ctx, &title, remote.as_deref()),
        Commands::List { json } => commands::run_list(ctx, json),
        Commands::Info { title } => commands::run_info(ctx, title.as_deref()),
        Commands::Download { title } => commands::run_download(ctx, &title),
        Commands::Install { requirement } => commands::run_install(ctx, requirement.as_deref()),
        Commands::Uninstall {
            title,
            version,
            major,
        } => commands::run_uninstall(ctx, &title, version.as_deref(), major),
        Commands::Release {
            version,
            major,
            minor,
            patch,
            strict,
            message,
        } => {
            let next = commands::release::next_from_flags(version.as_deref(), major, minor, patch)?;
            commands::run_release(ctx, next, strict, message)
        }
        Commands::Graph { title, no_detect } => commands::run_graph(ctx, title.as_deref(), !no_detect),
        Commands::Remote { url, unset, market } => {
            commands::run_remote(ctx, url.as_deref(), unset, market.as_deref())
        }
        Commands::Workspace { .. } | Commands::Market { .. } | Commands::Completions { .. } => {
            Ok(())
        }
    }
}
