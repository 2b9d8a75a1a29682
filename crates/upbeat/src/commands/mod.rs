//! Subcommand handlers.

pub mod config_cmd;
pub mod probe;
pub mod run;
