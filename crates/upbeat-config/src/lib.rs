//! Configuration for the upbeat agent.
//!
//! TOML file + `UPBEAT_` environment layering, secret resolution (env
//! indirection + plaintext), and translation to `upbeat_core::AgentConfig`.
//! The binary applies its own flag overrides on top of [`Config`] before
//! calling [`to_agent_config`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use upbeat_core::{
    AgentConfig, Backoff, CoreError, LinkBackend, Method, NetworkCredentials, ProbeRequest,
    TlsMode, TransportConfig,
};

/// Placeholder printed instead of secret values.
pub const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{field} names environment variable '{var}', which is not set")]
    MissingSecret { field: String, var: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub wifi: Wifi,

    #[serde(default)]
    pub monitor: Monitor,

    #[serde(default)]
    pub timing: Timing,

    #[serde(default)]
    pub indicator: IndicatorSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WifiBackend {
    #[default]
    NetworkManager,
    Static,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Wifi {
    /// How the link is brought up.
    #[serde(default)]
    pub backend: WifiBackend,

    /// Network name.
    #[serde(default)]
    pub ssid: String,

    /// Network secret (plaintext -- prefer `psk_env`).
    pub psk: Option<String>,

    /// Environment variable holding the network secret.
    pub psk_env: Option<String>,

    /// Wi-Fi interface, e.g. "wlan0".
    pub interface: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Monitor {
    /// Monitor base URL (e.g., "https://oubot.example.dev").
    pub url: Option<String>,

    /// Liveness route, relative to `url`.
    #[serde(default = "default_path")]
    pub path: String,

    /// Request method.
    #[serde(default = "default_method")]
    pub method: String,

    /// Authorization header value (plaintext -- prefer `token_env`).
    pub token: Option<String>,

    /// Environment variable holding the token.
    pub token_env: Option<String>,

    /// Accept any server certificate. Required for https.
    #[serde(default)]
    pub insecure: bool,

    /// Connect / read / write timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            url: None,
            path: default_path(),
            method: default_method(),
            token: None,
            token_env: None,
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_path() -> String {
    upbeat_core::LIVENESS_PATH.into()
}
fn default_method() -> String {
    "GET".into()
}
fn default_timeout() -> u64 {
    3
}

/// Backoff schedule, all in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Timing {
    pub activation_error: u64,
    pub association_failed: u64,
    pub probe_failed: u64,
    pub probe_interval: u64,
    pub poll_interval: u64,
}

impl Default for Timing {
    fn default() -> Self {
        let b = Backoff::default();
        Self {
            activation_error: b.activation_error.as_secs(),
            association_failed: b.association_failed.as_secs(),
            probe_failed: b.probe_failed.as_secs(),
            probe_interval: b.probe_interval.as_secs(),
            poll_interval: b.poll_interval.as_secs(),
        }
    }
}

impl Timing {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            activation_error: Duration::from_secs(self.activation_error),
            association_failed: Duration::from_secs(self.association_failed),
            probe_failed: Duration::from_secs(self.probe_failed),
            probe_interval: Duration::from_secs(self.probe_interval),
            poll_interval: Duration::from_secs(self.poll_interval),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndicatorSection {
    /// LED class device name (`led0`) or directory path. Log-only when unset.
    pub led: Option<String>,
}

/// Where the status indicator is wired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorTarget {
    LogOnly,
    /// A name under `/sys/class/leds`.
    Named(String),
    /// An LED class directory.
    Path(PathBuf),
}

impl IndicatorSection {
    pub fn target(&self) -> IndicatorTarget {
        match self.led.as_deref().map(str::trim) {
            None | Some("") => IndicatorTarget::LogOnly,
            Some(led) if led.contains('/') => IndicatorTarget::Path(PathBuf::from(led)),
            Some(led) => IndicatorTarget::Named(led.to_owned()),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "kittyandrew", "upbeat").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("upbeat");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: defaults, then the TOML file, then `UPBEAT_*` env.
///
/// Nested keys use `__`: `UPBEAT_MONITOR__URL` sets `monitor.url`.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UPBEAT_").split("__"))
}

/// Load the full Config from `path` (or the default location) + environment.
/// A missing file is not an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

/// Copy of `cfg` with every secret replaced by [`REDACTED`].
pub fn redacted(cfg: &Config) -> Config {
    let mut out = cfg.clone();
    if out.wifi.psk.is_some() {
        out.wifi.psk = Some(REDACTED.into());
    }
    if out.monitor.token.is_some() {
        out.monitor.token = Some(REDACTED.into());
    }
    out
}

/// Render `cfg` as TOML with secrets redacted.
pub fn render_redacted(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(&redacted(cfg))?)
}

// ── Secret resolution ───────────────────────────────────────────────

/// `*_env` indirection first, then the plaintext value.
///
/// Naming a variable that is not set is an error rather than a silent
/// fallback, so a typo in `psk_env` does not join with the wrong secret.
fn resolve_secret(
    field: &str,
    plaintext: Option<&str>,
    env_name: Option<&str>,
) -> Result<Option<SecretString>, ConfigError> {
    if let Some(var) = env_name {
        return match std::env::var(var) {
            Ok(val) => Ok(Some(SecretString::from(val))),
            Err(_) => Err(ConfigError::MissingSecret {
                field: field.into(),
                var: var.into(),
            }),
        };
    }
    Ok(plaintext.map(|s| SecretString::from(s.to_owned())))
}

pub fn resolve_psk(wifi: &Wifi) -> Result<SecretString, ConfigError> {
    Ok(resolve_secret("wifi.psk_env", wifi.psk.as_deref(), wifi.psk_env.as_deref())?
        .unwrap_or_else(|| SecretString::from(String::new())))
}

pub fn resolve_token(monitor: &Monitor) -> Result<Option<SecretString>, ConfigError> {
    resolve_secret(
        "monitor.token_env",
        monitor.token.as_deref(),
        monitor.token_env.as_deref(),
    )
}

// ── Translation ─────────────────────────────────────────────────────

/// Build and validate an `AgentConfig`.
///
/// This is the single boundary where TOML types cross into core types.
pub fn to_agent_config(cfg: &Config) -> Result<AgentConfig, ConfigError> {
    let url = cfg
        .monitor
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ConfigError::Validation {
            field: "monitor.url".into(),
            reason: "not set".into(),
        })?;

    let method: Method = cfg.monitor.method.parse().map_err(|_| ConfigError::Validation {
        field: "monitor.method".into(),
        reason: format!("expected GET, HEAD, POST or PUT, got '{}'", cfg.monitor.method),
    })?;

    let link = match cfg.wifi.backend {
        WifiBackend::NetworkManager => LinkBackend::NetworkManager {
            interface: cfg.wifi.interface.clone(),
        },
        WifiBackend::Static => LinkBackend::Static,
    };

    let mut probe = ProbeRequest::new(url, resolve_token(&cfg.monitor)?);
    probe.path.clone_from(&cfg.monitor.path);
    probe.method = method;

    let transport = TransportConfig {
        tls: if cfg.monitor.insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::Disabled
        },
        timeout: Duration::from_secs(cfg.monitor.timeout),
    };

    let agent = AgentConfig {
        link,
        network: NetworkCredentials {
            ssid: cfg.wifi.ssid.clone(),
            psk: resolve_psk(&cfg.wifi)?,
        },
        probe,
        transport,
        backoff: cfg.timing.backoff(),
    };
    agent.validate()?;
    Ok(agent)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
        [wifi]
        ssid = "wifi-name-2.4"
        psk = "hunter22"
        interface = "wlan0"

        [monitor]
        url = "https://oubot.example.dev"
        token = "abc123"
        insecure = true

        [timing]
        association_failed = 30

        [indicator]
        led = "led0"
    "#;

    #[test]
    fn defaults_without_file() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .extract()
            .unwrap();
        assert_eq!(cfg.wifi.backend, WifiBackend::NetworkManager);
        assert_eq!(cfg.monitor.path, "api/v1/up");
        assert_eq!(cfg.monitor.timeout, 3);
        assert_eq!(cfg.timing.association_failed, 10);
        assert_eq!(cfg.indicator.target(), IndicatorTarget::LogOnly);
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.wifi.ssid, "wifi-name-2.4");
        assert_eq!(cfg.timing.association_failed, 30);
        assert_eq!(cfg.timing.probe_failed, 4);
        assert_eq!(cfg.indicator.target(), IndicatorTarget::Named("led0".into()));

        let agent = to_agent_config(&cfg).unwrap();
        assert_eq!(agent.backoff.association_failed, Duration::from_secs(30));
        assert_eq!(agent.transport.tls, TlsMode::DangerAcceptInvalid);
        assert_eq!(agent.probe.token.unwrap().expose_secret(), "abc123");
        assert_eq!(
            agent.link,
            LinkBackend::NetworkManager {
                interface: Some("wlan0".into())
            }
        );
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", SAMPLE)?;
            jail.set_env("UPBEAT_MONITOR__URL", "http://monitor.lan:8080");
            jail.set_env("UPBEAT_WIFI__BACKEND", "static");

            let cfg = load_config(Some(Path::new("config.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(cfg.monitor.url.as_deref(), Some("http://monitor.lan:8080"));
            assert_eq!(cfg.wifi.backend, WifiBackend::Static);
            assert_eq!(cfg.wifi.ssid, "wifi-name-2.4");
            Ok(())
        });
    }

    #[test]
    fn env_indirection_wins_over_plaintext() {
        Jail::expect_with(|jail| {
            jail.set_env("TEST_UPBEAT_PSK", "from-env");
            let wifi = Wifi {
                psk: Some("from-file".into()),
                psk_env: Some("TEST_UPBEAT_PSK".into()),
                ..Wifi::default()
            };
            let psk = resolve_psk(&wifi).map_err(|e| e.to_string())?;
            assert_eq!(psk.expose_secret(), "from-env");
            Ok(())
        });
    }

    #[test]
    fn unset_indirection_is_an_error() {
        let monitor = Monitor {
            token: Some("fallback".into()),
            token_env: Some("UPBEAT_TEST_SURELY_UNSET_TOKEN".into()),
            ..Monitor::default()
        };
        let err = resolve_token(&monitor).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret { .. }), "{err}");
    }

    #[test]
    fn missing_url_is_validation_error() {
        let mut cfg = Config::default();
        cfg.wifi.ssid = "net".into();
        let err = to_agent_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "monitor.url"));
    }

    #[test]
    fn https_without_insecure_is_rejected() {
        let mut cfg = Config::default();
        cfg.wifi.ssid = "net".into();
        cfg.monitor.url = Some("https://oubot.example.dev".into());
        let err = to_agent_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Core(CoreError::Config { .. })), "{err}");
    }

    #[test]
    fn zero_failure_timing_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [wifi]
            backend = "static"

            [monitor]
            url = "http://monitor.lan"

            [timing]
            probe_failed = 0
            "#,
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        let err = to_agent_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("timing.probe_failed"), "{err}");
    }

    #[test]
    fn token_with_line_break_is_rejected() {
        let mut cfg = Config::default();
        cfg.wifi.backend = WifiBackend::Static;
        cfg.monitor.url = Some("http://monitor.lan".into());
        cfg.monitor.token = Some("abc\r\nX-Evil: 1".into());
        let err = to_agent_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::Core(CoreError::Config { .. })), "{err}");
    }

    #[test]
    fn bad_method_is_rejected() {
        let mut cfg = Config::default();
        cfg.wifi.backend = WifiBackend::Static;
        cfg.monitor.url = Some("http://monitor.lan".into());
        cfg.monitor.method = "BREW".into();
        assert!(to_agent_config(&cfg).is_err());

        cfg.monitor.method = "head".into();
        assert_eq!(to_agent_config(&cfg).unwrap().probe.method, Method::Head);
    }

    #[test]
    fn redaction_hides_secrets() {
        let mut cfg = Config::default();
        cfg.wifi.psk = Some("hunter22".into());
        cfg.monitor.token = Some("abc123".into());
        let rendered = render_redacted(&cfg).unwrap();
        assert!(!rendered.contains("hunter22"));
        assert!(!rendered.contains("abc123"));
        assert!(rendered.contains(REDACTED));
    }

    #[test]
    fn indicator_paths() {
        let section = IndicatorSection {
            led: Some("/sys/class/leds/ACT".into()),
        };
        assert_eq!(
            section.target(),
            IndicatorTarget::Path(PathBuf::from("/sys/class/leds/ACT"))
        );
    }
}
