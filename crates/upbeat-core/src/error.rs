// ── Core error types ──
//
// What the supervisor logs and what the CLI turns into diagnostics.
// The `From<upbeat_api::Error>` impl folds wire-level failures into the
// same taxonomy as link-layer ones, so every failure carries a kind.

use thiserror::Error;

pub use upbeat_api::ErrorKind;

use crate::radio::RadioError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Endpoint errors ──────────────────────────────────────────────
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("Cannot resolve {host}")]
    Resolution { host: String },

    // ── Transport errors ─────────────────────────────────────────────
    #[error("Cannot reach monitor: {reason}")]
    ConnectionFailed { reason: String },

    #[error("{op} timed out after {after_ms}ms")]
    Timeout { op: &'static str, after_ms: u64 },

    #[error("Protocol error: {message}")]
    Protocol { message: String },

    // ── Link errors ──────────────────────────────────────────────────
    #[error("Association failed: {message}")]
    Association { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Runtime failure class of this error.
    ///
    /// `None` for [`CoreError::Config`]: configuration errors are fatal at
    /// startup and never reach the loop, so they have no retry class.
    pub fn kind(&self) -> Option<ErrorKind> {
        let kind = match self {
            Self::MalformedUrl { .. } => ErrorKind::MalformedUrl,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::ConnectionFailed { .. } => ErrorKind::Connect,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Association { .. } => ErrorKind::Association,
            Self::Config { .. } => return None,
        };
        Some(kind)
    }
}

// ── Conversion from lower-layer errors ───────────────────────────────

impl From<upbeat_api::Error> for CoreError {
    fn from(err: upbeat_api::Error) -> Self {
        match err {
            upbeat_api::Error::MalformedUrl { url, reason } => CoreError::MalformedUrl { url, reason },
            upbeat_api::Error::Resolution { host, port } => CoreError::Resolution {
                host: format!("{host}:{port}"),
            },
            upbeat_api::Error::Connect { addr, source } => CoreError::ConnectionFailed {
                reason: format!("connect to {addr}: {source}"),
            },
            upbeat_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                reason: format!("TLS: {msg}"),
            },
            upbeat_api::Error::Io { op, source } => CoreError::ConnectionFailed {
                reason: format!("{op}: {source}"),
            },
            upbeat_api::Error::Timeout { op, after } => CoreError::Timeout {
                op,
                after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
            },
            upbeat_api::Error::Protocol(message) => CoreError::Protocol { message },
        }
    }
}

impl From<RadioError> for CoreError {
    fn from(err: RadioError) -> Self {
        CoreError::Association {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn api_errors_keep_their_kind() {
        let cases = [
            upbeat_api::Error::Resolution {
                host: "h".into(),
                port: 80,
            },
            upbeat_api::Error::Tls("bad record".into()),
            upbeat_api::Error::Timeout {
                op: "connect",
                after: Duration::from_secs(3),
            },
            upbeat_api::Error::Protocol("empty".into()),
        ];
        for err in cases {
            let kind = err.kind();
            assert_eq!(CoreError::from(err).kind(), Some(kind));
        }
    }

    #[test]
    fn timeout_renders_millis() {
        let err = CoreError::from(upbeat_api::Error::Timeout {
            op: "read",
            after: Duration::from_secs(3),
        });
        assert_eq!(err.to_string(), "read timed out after 3000ms");
    }

    #[test]
    fn radio_errors_are_association_errors() {
        let err = CoreError::from(RadioError::Activation("rfkill".into()));
        assert_eq!(err.kind(), Some(ErrorKind::Association));
    }

    #[test]
    fn config_errors_have_no_runtime_kind() {
        let err = CoreError::Config {
            message: "wifi network name (ssid) is not set".into(),
        };
        assert_eq!(err.kind(), None);

        let err = CoreError::MalformedUrl {
            url: "monitor.lan".into(),
            reason: "missing '://' scheme separator".into(),
        };
        assert_eq!(err.kind(), Some(ErrorKind::MalformedUrl));
    }
}
