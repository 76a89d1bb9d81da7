use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Command-line interface for the dotfiles access resolver
#[derive(Parser)]
#[command(name = "dotgate")]
#[command(about = "Works out how this machine can reach a private dotfiles repository")]
pub struct Cli {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Read settings from this file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Try every access method in order, with guided recovery when all fail
    Resolve {
        /// Repository owner to resolve against
        #[arg(long)]
        owner: Option<String>,

        /// Repository name to resolve against
        #[arg(long)]
        repo: Option<String>,

        /// Never prompt; report denial instead of starting recovery
        #[arg(long)]
        non_interactive: bool,

        /// Maximum confirm-and-retry rounds during recovery
        #[arg(long, value_name = "N")]
        max_retries: Option<u32>,
    },
    /// Run each probe once and report the per-method outcomes
    Check {
        /// Repository owner to check against
        #[arg(long)]
        owner: Option<String>,

        /// Repository name to check against
        #[arg(long)]
        repo: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect or create the dedicated deploy key
    Key {
        /// Key operation to perform
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Write the SSH host alias and known_hosts entries (idempotent)
    Bootstrap,
    /// Check environment health for access resolution
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Show version information
    Version,
}

/// Deploy key operations
#[derive(Subcommand)]
pub enum KeyCommands {
    /// Print the public half of the deploy key
    Show {
        /// Copy the public key to the clipboard as well
        #[arg(long)]
        copy: bool,
    },
    /// Create the deploy key if it does not already exist
    Generate,
}
