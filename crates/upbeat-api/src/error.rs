use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `upbeat-api` crate.
///
/// Covers every failure mode of a single probe: URL parsing, name
/// resolution, connect, TLS, stream I/O and the status line itself.
/// Nothing in this crate retries; `upbeat-core` decides what to do next.
#[derive(Debug, Error)]
pub enum Error {
    // ── Endpoint ────────────────────────────────────────────────────
    /// The URL has no `://`, an unsupported scheme, an empty host, or a
    /// port that is not a number in 1..=65535.
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// Name resolution produced no addresses.
    #[error("No address found for {host}:{port}")]
    Resolution { host: String, port: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// TCP connect failed (refused, unreachable, ...).
    #[error("Connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// TLS client setup or handshake failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A bounded wait ran out.
    #[error("{op} timed out after {}ms", after.as_millis())]
    Timeout { op: &'static str, after: Duration },

    /// Write or read on an established stream failed.
    #[error("Stream {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    // ── Protocol ────────────────────────────────────────────────────
    /// The peer closed without sending a status line, or sent garbage.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Coarse classification used for logging and backoff decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    MalformedUrl,
    Resolution,
    Connect,
    Timeout,
    Association,
    Protocol,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedUrl { .. } => ErrorKind::MalformedUrl,
            Self::Resolution { .. } => ErrorKind::Resolution,
            Self::Connect { .. } | Self::Tls(_) | Self::Io { .. } => ErrorKind::Connect,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Protocol(_) => ErrorKind::Protocol,
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl Into<String>) -> Self {
        Self::MalformedUrl {
            url: url.to_owned(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_and_stream_failures_classify_as_connect() {
        assert_eq!(Error::Tls("handshake".into()).kind(), ErrorKind::Connect);
        let io = Error::Io {
            op: "write",
            source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
        };
        assert_eq!(io.kind(), ErrorKind::Connect);
    }

    #[test]
    fn kind_renders_snake_case() {
        assert_eq!(ErrorKind::MalformedUrl.to_string(), "malformed_url");
        let name: &'static str = ErrorKind::Timeout.into();
        assert_eq!(name, "timeout");
    }
}
