// One liveness probe: parse → resolve → connect → write head → read status line.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::request::{Method, encode_request};
use crate::transport::{TransportConfig, TransportSession};

/// Fixed path of the monitor's liveness route.
pub const LIVENESS_PATH: &str = "api/v1/up";

/// What to send on every probe. Built once from configuration.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    /// Base URL of the monitor, e.g. `https://monitor.example.dev`.
    pub base_url: String,
    /// Path relative to `base_url`, normally [`LIVENESS_PATH`].
    pub path: String,
    pub method: Method,
    /// Sent verbatim as the `Authorization` header value.
    pub token: Option<SecretString>,
}

impl ProbeRequest {
    pub fn new(base_url: impl Into<String>, token: Option<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            path: LIVENESS_PATH.into(),
            method: Method::default(),
            token,
        }
    }

    /// Build a fresh endpoint for one attempt.
    pub fn endpoint(&self) -> Result<Endpoint, Error> {
        Endpoint::join(&self.base_url, &self.path)
    }
}

/// The first response line, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine(String);

impl StatusLine {
    /// Interpret raw bytes read off the wire.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::Protocol(
                "connection closed before status line".into(),
            ));
        }
        let text = std::str::from_utf8(raw)
            .map_err(|_| Error::Protocol("status line is not valid UTF-8".into()))?
            .trim_end_matches(['\r', '\n']);
        if !text.starts_with("HTTP/") {
            return Err(Error::Protocol(format!("unexpected status line '{text}'")));
        }
        Ok(Self(text.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric status code, for logging only. Never used to judge success.
    pub fn code(&self) -> Option<u16> {
        self.0.split_whitespace().nth(1)?.parse().ok()
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Perform one probe and return the status line.
///
/// Opens a fresh session, which is closed before returning on every path.
/// Errors are returned as-is; the caller owns retry policy.
#[instrument(skip_all, fields(url = %request.base_url))]
pub async fn probe(request: &ProbeRequest, transport: &TransportConfig) -> Result<StatusLine, Error> {
    let endpoint = request.endpoint()?;
    let addr = endpoint.resolve().await?;

    let head = encode_request(
        request.method,
        &endpoint,
        request.token.as_ref().map(|t| t.expose_secret()),
    );

    let mut session =
        TransportSession::open(addr, endpoint.scheme.is_secure(), &endpoint.host, transport)
            .await?;
    let result = exchange(&mut session, &head).await;
    session.close().await;

    let status = result?;
    debug!(%endpoint, status = %status, "probe answered");
    Ok(status)
}

async fn exchange(session: &mut TransportSession, head: &[u8]) -> Result<StatusLine, Error> {
    session.write(head).await?;
    let line = session.read_line().await?;
    StatusLine::from_bytes(&line)
}
