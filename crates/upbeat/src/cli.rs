//! Clap derive structures for the `upbeat` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// upbeat -- keep the link up, tell the monitor you're alive
#[derive(Debug, Parser)]
#[command(
    name = "upbeat",
    version,
    about = "Liveness agent for headless networked devices",
    long_about = "Keeps a wireless association up, reports liveness to a monitoring\n\
        endpoint over HTTP or HTTPS, and signals health through one LED.\n\n\
        Runs forever: every failure becomes a wait-and-retry.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "UPBEAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Monitor base URL (overrides config)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Authorization header value sent with every probe
    #[arg(long, env = "UPBEAT_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Accept any TLS certificate (required for https monitors)
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Connect / read / write timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Associate and probe until interrupted
    Run,

    /// Send a single probe and print the status line
    Probe,

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
