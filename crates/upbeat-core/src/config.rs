// ── Runtime agent configuration ──
//
// Everything the supervisor needs, built once at startup and never
// mutated. The binary constructs an `AgentConfig` (via `upbeat-config`)
// and hands it in -- core never reads files or the environment.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use upbeat_api::{Endpoint, ProbeRequest, Scheme, TlsMode, TransportConfig};

use crate::error::CoreError;

/// Wireless network to join.
#[derive(Debug, Clone)]
pub struct NetworkCredentials {
    pub ssid: String,
    pub psk: SecretString,
}

/// How the wireless link is managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkBackend {
    /// Join through NetworkManager (`nmcli`).
    NetworkManager {
        /// Wi-Fi interface; the first Wi-Fi device when unset.
        interface: Option<String>,
    },
    /// The link is managed elsewhere and assumed to be up.
    Static,
}

impl Default for LinkBackend {
    fn default() -> Self {
        Self::NetworkManager { interface: None }
    }
}

impl LinkBackend {
    pub fn needs_credentials(&self) -> bool {
        matches!(self, Self::NetworkManager { .. })
    }
}

/// Named wait per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// After the radio refused to activate or start joining.
    pub activation_error: Duration,
    /// After association ended in a failure status.
    pub association_failed: Duration,
    /// After any probe failure.
    pub probe_failed: Duration,
    /// Between successful probes.
    pub probe_interval: Duration,
    /// Between link status polls while associating.
    pub poll_interval: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            activation_error: Duration::from_secs(4),
            association_failed: Duration::from_secs(10),
            probe_failed: Duration::from_secs(4),
            probe_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl Backoff {
    /// All waits zero. For driving the supervisor in tests; `validate`
    /// rejects it.
    pub const fn immediate() -> Self {
        Self {
            activation_error: Duration::ZERO,
            association_failed: Duration::ZERO,
            probe_failed: Duration::ZERO,
            probe_interval: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Complete agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub link: LinkBackend,
    pub network: NetworkCredentials,
    pub probe: ProbeRequest,
    pub transport: TransportConfig,
    pub backoff: Backoff,
}

impl AgentConfig {
    /// Reject configurations the loop could never recover from.
    ///
    /// Called once before the supervisor starts; anything caught here is
    /// fatal instead of turning into an endless retry.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.link.needs_credentials() && self.network.ssid.trim().is_empty() {
            return Err(CoreError::Config {
                message: "wifi network name (ssid) is not set".into(),
            });
        }

        if self.link.needs_credentials() && self.network.psk.expose_secret().is_empty() {
            tracing::warn!(ssid = %self.network.ssid, "no wifi secret set, joining as open network");
        }

        let endpoint = Endpoint::join(&self.probe.base_url, &self.probe.path)?;

        let token = self.probe.token.as_ref().map(|t| t.expose_secret());
        if token.is_some_and(|t| t.chars().any(char::is_control)) {
            return Err(CoreError::Config {
                message: "monitor token contains control characters".into(),
            });
        }

        if endpoint.scheme == Scheme::Secure && self.transport.tls == TlsMode::Disabled {
            return Err(CoreError::Config {
                message: format!(
                    "{endpoint} uses https but certificate verification is unavailable; \
                     set monitor.insecure = true to accept unverified certificates"
                ),
            });
        }

        if self.transport.timeout.is_zero() {
            return Err(CoreError::Config {
                message: "transport timeout must be greater than zero".into(),
            });
        }

        for (name, wait) in [
            ("activation_error", self.backoff.activation_error),
            ("association_failed", self.backoff.association_failed),
            ("probe_failed", self.backoff.probe_failed),
        ] {
            if wait.is_zero() {
                return Err(CoreError::Config {
                    message: format!("timing.{name} must be greater than zero"),
                });
            }
        }

        Ok(())
    }
}
