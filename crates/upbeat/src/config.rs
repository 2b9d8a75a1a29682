//! Flag overrides on top of the file + environment layers.
//!
//! Core never sees these types -- it receives a pre-built `AgentConfig`.

use std::path::PathBuf;

use upbeat_config::{Config, WifiBackend};
use upbeat_core::AgentConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Config file in effect: `--config` / `UPBEAT_CONFIG`, else the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(upbeat_config::config_path)
}

/// Load file + env, then apply CLI flags.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = upbeat_config::load_config(Some(&config_path(global)))?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref url) = global.url {
        cfg.monitor.url = Some(url.clone());
    }
    if let Some(ref token) = global.token {
        cfg.monitor.token = Some(token.clone());
        cfg.monitor.token_env = None;
    }
    if global.insecure {
        cfg.monitor.insecure = true;
    }
    if let Some(timeout) = global.timeout {
        cfg.monitor.timeout = timeout;
    }
}

/// Fully resolved configuration for `upbeat run`.
pub fn agent_config(global: &GlobalOpts) -> Result<(Config, AgentConfig), CliError> {
    let cfg = load(global)?;
    let agent = upbeat_config::to_agent_config(&cfg)?;
    Ok((cfg, agent))
}

/// Configuration for a one-off probe: the link is not touched, so no
/// wireless settings are required.
pub fn probe_config(global: &GlobalOpts) -> Result<AgentConfig, CliError> {
    let mut cfg = load(global)?;
    cfg.wifi.backend = WifiBackend::Static;
    Ok(upbeat_config::to_agent_config(&cfg)?)
}
