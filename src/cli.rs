//! CLI argument parsing via clap.

use clap::{ArgAction, Parser, Subcommand};

/// Let a model drive this desktop through the Anthropic Messages API.
#[derive(Debug, Parser)]
#[command(name = "deskpilot", disable_version_flag = true)]
pub struct Args {
    /// Prompt to send. If provided, runs in one-shot mode and exits.
    pub prompt: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to config file (default: ./deskpilot.toml or ~/.config/deskpilot/deskpilot.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Override model name.
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Override API base URL.
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,

    /// Disable color output.
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Print a summary of every API request and response.
    #[arg(long = "show-http", global = true)]
    pub show_http: bool,

    /// More diagnostic logging on stderr (-v info, -vv debug).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print version and build metadata.
    #[arg(short = 'V', long = "version")]
    pub version: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP front end.
    Serve {
        /// Address to listen on (default from `[server] bind`).
        #[arg(long = "bind")]
        bind: Option<String>,
    },
}
