// Probe seam between the supervisor and the wire.

use std::future::Future;

use upbeat_api::{ErrorKind, ProbeRequest, StatusLine, TransportConfig};

use crate::config::AgentConfig;

/// Performs one liveness probe per call.
///
/// Implementations must not retry internally and must release every
/// resource they acquired before returning.
pub trait Prober {
    fn probe(&mut self) -> impl Future<Output = Result<StatusLine, upbeat_api::Error>>;
}

/// Probes the monitor over plain TCP or TLS.
#[derive(Debug, Clone)]
pub struct HttpProber {
    request: ProbeRequest,
    transport: TransportConfig,
}

impl HttpProber {
    pub fn new(request: ProbeRequest, transport: TransportConfig) -> Self {
        Self { request, transport }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.probe.clone(), config.transport.clone())
    }
}

impl Prober for HttpProber {
    async fn probe(&mut self) -> Result<StatusLine, upbeat_api::Error> {
        upbeat_api::probe(&self.request, &self.transport).await
    }
}

/// Result of one probe, flattened for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub succeeded: bool,
    pub status_line: Option<String>,
    pub failure: Option<ErrorKind>,
}

impl From<&Result<StatusLine, upbeat_api::Error>> for ProbeOutcome {
    fn from(result: &Result<StatusLine, upbeat_api::Error>) -> Self {
        match result {
            Ok(line) => Self {
                succeeded: true,
                status_line: Some(line.as_str().to_owned()),
                failure: None,
            },
            Err(e) => Self {
                succeeded: false,
                status_line: None,
                failure: Some(e.kind()),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn outcome_from_status_line() {
        let line = StatusLine::from_bytes(b"HTTP/1.0 503 Service Unavailable\r\n");
        let outcome = ProbeOutcome::from(&line);
        assert!(outcome.succeeded);
        assert_eq!(outcome.status_line.as_deref(), Some("HTTP/1.0 503 Service Unavailable"));
        assert_eq!(outcome.failure, None);
    }

    #[test]
    fn outcome_from_error_keeps_kind() {
        let err: Result<StatusLine, _> = Err(upbeat_api::Error::Timeout {
            op: "read",
            after: Duration::from_secs(3),
        });
        let outcome = ProbeOutcome::from(&err);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.failure, Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn http_prober_reports_malformed_url() {
        let mut prober = HttpProber::new(
            ProbeRequest::new("not a url", None),
            TransportConfig::default(),
        );
        let err = prober.probe().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedUrl);
    }
}
