// NetworkManager backend, driven through `nmcli`.
//
// NM device states (`GENERAL.STATE`) are mapped onto the link status
// table. NM falls back to "disconnected" (30) after a failed attempt,
// which would look like "not started yet"; the backend remembers whether
// it has seen progress and reports that fallback as a failure.

use std::time::Duration;

use secrecy::ExposeSecret;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use super::{LINK_DOWN, LINK_FAIL, LINK_JOIN, LINK_NOIP, LINK_NONET, LINK_UP, Radio, RadioError};
use crate::config::NetworkCredentials;

const NMCLI: &str = "nmcli";

/// Bound on any single `nmcli` invocation.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(15);

/// Polls in "disconnected" before the join is presumed never to have started.
const DOWN_GRACE_POLLS: u32 = 15;

/// Joins Wi-Fi networks through NetworkManager.
#[derive(Debug, Clone)]
pub struct NetworkManager {
    interface: Option<String>,
    program: String,
    seen_progress: bool,
    down_polls: u32,
}

impl NetworkManager {
    pub fn new(interface: Option<String>) -> Self {
        Self {
            interface,
            program: NMCLI.into(),
            seen_progress: false,
            down_polls: 0,
        }
    }

    /// Use a different `nmcli` binary (tests, non-standard installs).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, RadioError> {
        trace!(program = %self.program, ?args, "running");
        let output = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new(&self.program).args(args).kill_on_drop(true).output(),
        )
        .await
        .map_err(|_| RadioError::Timeout {
            program: self.program.clone(),
            secs: COMMAND_TIMEOUT.as_secs(),
        })?
        .map_err(|source| RadioError::Command {
            program: self.program.clone(),
            source,
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RadioError::Activation(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }

    /// The configured interface, or the first Wi-Fi device NM knows about.
    async fn interface(&mut self) -> Result<String, RadioError> {
        if let Some(ref iface) = self.interface {
            return Ok(iface.clone());
        }
        let listing = self.run(&["-t", "-f", "DEVICE,TYPE", "device"]).await?;
        let iface = first_wifi_device(&listing)
            .ok_or_else(|| RadioError::Activation("no wifi device found".into()))?;
        debug!(interface = %iface, "discovered wifi interface");
        self.interface = Some(iface.clone());
        Ok(iface)
    }
}

impl Radio for NetworkManager {
    async fn activate(&mut self, network: &NetworkCredentials) -> Result<(), RadioError> {
        self.seen_progress = false;
        self.down_polls = 0;

        self.run(&["radio", "wifi", "on"]).await?;
        let iface = self.interface().await?;

        let mut args = vec![
            "--wait",
            "0",
            "device",
            "wifi",
            "connect",
            network.ssid.as_str(),
        ];
        let psk = network.psk.expose_secret();
        if !psk.is_empty() {
            args.extend(["password", psk]);
        }
        args.extend(["ifname", iface.as_str()]);

        self.run(&args).await?;
        debug!(ssid = %network.ssid, interface = %iface, "join requested");
        Ok(())
    }

    async fn status(&mut self) -> i32 {
        let iface = match self.interface().await {
            Ok(iface) => iface,
            Err(e) => {
                warn!(error = %e, "cannot determine wifi interface");
                return LINK_FAIL;
            }
        };

        let raw = match self
            .run(&["-t", "-g", "GENERAL.STATE", "device", "show", iface.as_str()])
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "link status query failed");
                return LINK_FAIL;
            }
        };

        let Some(state) = parse_device_state(&raw) else {
            warn!(raw = raw.trim(), "unparseable device state");
            return LINK_FAIL;
        };

        let status = link_status(state);
        if status == LINK_DOWN {
            if self.seen_progress {
                return LINK_FAIL;
            }
            self.down_polls += 1;
            if self.down_polls > DOWN_GRACE_POLLS {
                return LINK_NONET;
            }
        } else {
            self.seen_progress = true;
        }
        status
    }

    async fn address(&mut self) -> Option<String> {
        let iface = self.interface().await.ok()?;
        let raw = self
            .run(&["-t", "-g", "IP4.ADDRESS", "device", "show", iface.as_str()])
            .await
            .ok()?;
        parse_address(&raw)
    }
}

// ── Output parsing ───────────────────────────────────────────────────

/// `wlan0:wifi\nlo:loopback` → `wlan0`.
fn first_wifi_device(listing: &str) -> Option<String> {
    listing.lines().find_map(|line| {
        let (device, kind) = line.rsplit_once(':')?;
        (kind.trim() == "wifi").then(|| device.to_owned())
    })
}

/// `100 (connected)` → `100`.
fn parse_device_state(raw: &str) -> Option<u32> {
    raw.split_whitespace().next()?.parse().ok()
}

/// `192.168.1.23/24 | 10.0.0.2/8` → `192.168.1.23`.
fn parse_address(raw: &str) -> Option<String> {
    let first = raw.split(['|', '\n']).map(str::trim).find(|s| !s.is_empty())?;
    Some(first.split('/').next().unwrap_or(first).to_owned())
}

/// NetworkManager `NMDeviceState` → link status code.
fn link_status(nm_state: u32) -> i32 {
    match nm_state {
        100 => LINK_UP,
        70 | 80 | 90 => LINK_NOIP,
        40 | 50 | 60 => LINK_JOIN,
        30 => LINK_DOWN,
        10 | 20 => LINK_NONET,
        _ => LINK_FAIL,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_wifi_device() {
        let listing = "eth0:ethernet\nwlan0:wifi\nwlan1:wifi\nlo:loopback\n";
        assert_eq!(first_wifi_device(listing).as_deref(), Some("wlan0"));
        assert_eq!(first_wifi_device("eth0:ethernet\n"), None);
    }

    #[test]
    fn parses_device_state() {
        assert_eq!(parse_device_state("100 (connected)\n"), Some(100));
        assert_eq!(parse_device_state("garbage"), None);
        assert_eq!(parse_device_state(""), None);
    }

    #[test]
    fn parses_address() {
        assert_eq!(parse_address("192.168.1.23/24\n").as_deref(), Some("192.168.1.23"));
        assert_eq!(
            parse_address("10.0.0.2/8 | 10.0.0.3/8\n").as_deref(),
            Some("10.0.0.2")
        );
        assert_eq!(parse_address("\n"), None);
    }

    #[test]
    fn maps_nm_states() {
        assert_eq!(link_status(100), LINK_UP);
        assert_eq!(link_status(50), LINK_JOIN);
        assert_eq!(link_status(80), LINK_NOIP);
        assert_eq!(link_status(30), LINK_DOWN);
        assert_eq!(link_status(20), LINK_NONET);
        assert_eq!(link_status(120), LINK_FAIL);
        assert_eq!(link_status(0), LINK_FAIL);
    }

    #[tokio::test]
    async fn missing_program_is_activation_error() {
        let mut radio = NetworkManager::new(Some("wlan0".into()))
            .with_program("/nonexistent/upbeat-nmcli");
        let network = NetworkCredentials {
            ssid: "net".into(),
            psk: secrecy::SecretString::from(String::new()),
        };
        let err = radio.activate(&network).await.unwrap_err();
        assert!(matches!(err, RadioError::Command { .. }), "{err}");
        assert_eq!(radio.status().await, LINK_FAIL);
    }
}
