//! CLI argument parsing using clap

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use clap_complete::Shell;

/// Blockyard - Manage HDL blocks, their releases and dependencies
#[derive(Parser, Debug)]
#[command(name = "yard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Answer yes to every confirmation and take the first choice offered
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Settings directory (defaults to ~/.yard)
    #[arg(long, global = true, env = "YARD_HOME")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create a new block in the active workspace
    ///
    /// Examples:
    ///   yard init math.adder
    ///   yard init open-cores.math.adder --remote https://example.com/adder.git
    Init {
        /// Block title: [market.]library.name
        title: String,

        /// URL of the block's origin remote
        #[arg(long)]
        remote: Option<String>,
    },

    /// List every known block and where copies of it live
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a block's metadata, releases and installed versions
    Info {
        /// Block title (defaults to the block in the current directory)
        title: Option<String>,
    },

    /// Clone a known block into the active workspace for development
    ///
    /// Examples:
    ///   yard download math.adder
    Download {
        /// Block title
        title: String,
    },

    /// Install a block, or the dependencies of the current block
    ///
    /// Examples:
    ///   yard install math.adder
    ///   yard install "math.adder(v1.2.0)"
    ///   yard install
    Install {
        /// Block to install, optionally with an exact version
        requirement: Option<String>,
    },

    /// Remove installed copies of a block from the cache
    #[command(group(ArgGroup::new("which").args(["version", "major"])))]
    Uninstall {
        /// Block title
        title: String,

        /// Remove only this exact version
        #[arg(long)]
        version: Option<String>,

        /// Remove a major version line
        #[arg(long)]
        major: Option<u64>,
    },

    /// Release the block in the current directory
    ///
    /// Examples:
    ///   yard release --patch
    ///   yard release v2.0.0 --strict -m "New interface"
    #[command(group(ArgGroup::new("bump").args(["version", "major", "minor", "patch"]).required(true)))]
    Release {
        /// Explicit next version
        version: Option<String>,

        /// Bump the major version
        #[arg(long)]
        major: bool,

        /// Bump the minor version
        #[arg(long)]
        minor: bool,

        /// Bump the patch version
        #[arg(long)]
        patch: bool,

        /// Commit only the marker and changelog
        #[arg(long)]
        strict: bool,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show the build order of a block and its dependency tree
    Graph {
        /// Block title (defaults to the block in the current directory)
        title: Option<String>,

        /// Do not detect or record the top-level and testbench
        #[arg(long)]
        no_detect: bool,
    },

    /// Show or change the current block's remote and market
    #[command(group(ArgGroup::new("remote_action").args(["url", "unset"])))]
    Remote {
        /// New origin URL
        url: Option<String>,

        /// Remove the origin remote
        #[arg(long)]
        unset: bool,

        /// Bind the block to a market (empty to unbind)
        #[arg(long)]
        market: Option<String>,
    },

    /// Manage workspaces
    ///
    /// Examples:
    ///   yard workspace add lab ~/hdl --activate
    ///   yard workspace use lab
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },

    /// Manage markets and their links to the active workspace
    ///
    /// Examples:
    ///   yard market add open-cores ~/markets/open-cores --link
    ///   yard market unlink open-cores
    Market {
        #[command(subcommand)]
        action: MarketAction,
    },

    /// Generate shell completions
    ///
    /// Examples:
    ///   yard completions bash > ~/.local/share/bash-completion/completions/yard
    ///   yard completions zsh > ~/.zfunc/_yard
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Workspace actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceAction {
    /// List workspaces, marking the active one
    List,

    /// Register a workspace directory
    Add {
        /// Workspace name
        name: String,

        /// Directory holding the workspace's blocks
        path: PathBuf,

        /// Make it the active workspace
        #[arg(long)]
        activate: bool,
    },

    /// Make a workspace the active one
    Use {
        /// Workspace name
        name: String,
    },
}

/// Market actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MarketAction {
    /// Register a market directory
    Add {
        /// Market name
        name: String,

        /// Directory holding the market's entries
        path: PathBuf,

        /// Also link it to the active workspace
        #[arg(long)]
        link: bool,
    },

    /// Link a registered market to the active workspace
    Link {
        /// Market name
        name: String,
    },

    /// Unlink a market from the active workspace
    Unlink {
        /// Market name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_no_args() {
        let cli = Cli::parse_from(["yard"]);
        assert!(!cli.verbose);
        assert!(!cli.yes);
        assert!(cli.command.is_none());
    }

    #[test]
    fn parse_global_flags_after_command() {
        let cli = Cli::parse_from(["yard", "list", "-v", "--yes"]);
        assert!(cli.verbose);
        assert!(cli.yes);
        assert_eq!(cli.command, Some(Commands::List { json: false }));
    }

    #[test]
    fn parse_home_flag() {
        let cli = Cli::parse_from(["yard", "--home", "/tmp/yard", "list", "--json"]);
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/yard")));
        assert_eq!(cli.command, Some(Commands::List { json: true }));
    }

    #[test]
    fn parse_init_with_remote() {
        let cli = Cli::parse_from(["yard", "init", "math.adder", "--remote", "/srv/adder.git"]);
        match cli.command {
            Some(Commands::Init { title, remote }) => {
                assert_eq!(title, "math.adder");
                assert_eq!(remote.as_deref(), Some("/srv/adder.git"));
            }
            _ => panic!("Expected Init command"),
        }
    }

    #[test]
    fn parse_install_without_requirement() {
        let cli = Cli::parse_from(["yard", "install"]);
        assert_eq!(cli.command, Some(Commands::Install { requirement: None }));
    }

    #[test]
    fn parse_uninstall_major() {
        let cli = Cli::parse_from(["yard", "uninstall", "math.adder", "--major", "2"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Uninstall { major: Some(2), version: None, .. })
        ));
    }

    #[test]
    fn uninstall_version_and_major_conflict() {
        let result = Cli::try_parse_from([
            "yard", "uninstall", "math.adder", "--major", "2", "--version", "2.0.0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_release_patch_strict() {
        let cli = Cli::parse_from(["yard", "release", "--patch", "--strict", "-m", "Fix carry"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Release { patch: true, strict: true, major: false, minor: false, version: None, message: Some(ref m) }) if m == "Fix carry"
        ));
    }

    #[test]
    fn release_requires_a_version_choice() {
        assert!(Cli::try_parse_from(["yard", "release"]).is_err());
        assert!(Cli::try_parse_from(["yard", "release", "--major", "--minor"]).is_err());
    }

    #[test]
    fn parse_remote_unset_with_market() {
        let cli = Cli::parse_from(["yard", "remote", "--unset", "--market", "open-cores"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Remote { url: None, unset: true, market: Some(ref m) }) if m == "open-cores"
        ));
    }

    #[test]
    fn parse_download() {
        let cli = Cli::parse_from(["yard", "download", "open.math.adder"]);
        assert_eq!(
            cli.command,
            Some(Commands::Download {
                title: "open.math.adder".to_string()
            })
        );
    }

    #[test]
    fn parse_workspace_add_activate() {
        let cli = Cli::parse_from(["yard", "workspace", "add", "lab", "/srv/hdl", "--activate"]);
        assert_eq!(
            cli.command,
            Some(Commands::Workspace {
                action: WorkspaceAction::Add {
                    name: "lab".to_string(),
                    path: PathBuf::from("/srv/hdl"),
                    activate: true,
                }
            })
        );
    }

    #[test]
    fn parse_market_unlink() {
        let cli = Cli::parse_from(["yard", "market", "unlink", "open-cores"]);
        assert_eq!(
            cli.command,
            Some(Commands::Market {
                action: MarketAction::Unlink {
                    name: "open-cores".to_string()
                }
            })
        );
    }

    #[test]
    fn workspace_requires_an_action() {
        assert!(Cli::try_parse_from(["yard", "workspace"]).is_err());
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["yard", "completions", "bash"]);
        assert!(matches!(cli.command, Some(Commands::Completions { .. })));
    }
}
