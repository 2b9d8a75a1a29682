//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use upbeat_config::ConfigError;
use upbeat_core::CoreError;

// SUCCESS and USAGE are produced by clap and a normal return.
#[allow(dead_code)]
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(upbeat::config),
        help(
            "Fix the setting in the config file (see: upbeat config path)\n\
             or the matching UPBEAT_* environment variable."
        )
    )]
    Config { message: String },

    #[error("Malformed monitor URL '{url}': {reason}")]
    #[diagnostic(
        code(upbeat::malformed_url),
        help("Expected scheme://host[:port][/path], e.g. https://monitor.example.dev")
    )]
    MalformedUrl { url: String, reason: String },

    // ── Probe ────────────────────────────────────────────────────────

    #[error("Cannot resolve {host}")]
    #[diagnostic(
        code(upbeat::resolution),
        help("Check the monitor host name and this device's DNS settings.")
    )]
    Resolution { host: String },

    #[error("Could not reach the monitor: {reason}")]
    #[diagnostic(
        code(upbeat::connection_failed),
        help(
            "Check that the monitor is running and reachable from this device.\n\
             For https monitors, --insecure (-k) is required."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("{op} timed out after {after_ms}ms")]
    #[diagnostic(
        code(upbeat::timeout),
        help("Increase the timeout with --timeout or check the monitor's responsiveness.")
    )]
    Timeout { op: &'static str, after_ms: u64 },

    #[error("Unexpected reply from the monitor: {message}")]
    #[diagnostic(code(upbeat::protocol))]
    Protocol { message: String },

    #[error("Association failed: {message}")]
    #[diagnostic(code(upbeat::association))]
    Association { message: String },

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::MalformedUrl { .. } => exit_code::CONFIG,
            Self::Resolution { .. } | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Protocol { .. } | Self::Association { .. } | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MalformedUrl { url, reason } => CliError::MalformedUrl { url, reason },
            CoreError::Resolution { host } => CliError::Resolution { host },
            CoreError::ConnectionFailed { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout { op, after_ms } => CliError::Timeout { op, after_ms },
            CoreError::Protocol { message } => CliError::Protocol { message },
            CoreError::Association { message } => CliError::Association { message },
            CoreError::Config { message } => CliError::Config { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Core(core) => core.into(),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
