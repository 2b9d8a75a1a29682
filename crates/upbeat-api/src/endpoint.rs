// Probe endpoint parsing and resolution.
//
// Deliberately not a general URL parser: only `http://` and `https://`,
// `host[:port]` authorities and an opaque path. No userinfo, no IPv6
// literals, no query handling beyond passing it through in the path.
// Host and path end up verbatim in the request head, so whitespace and
// control characters are rejected here.

use std::fmt;
use std::net::SocketAddr;

use tracing::debug;

use crate::error::Error;

/// Transport security of an endpoint, chosen by the URL scheme token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Scheme {
    #[strum(serialize = "http")]
    Plain,
    #[strum(serialize = "https")]
    Secure,
}

impl Scheme {
    /// Scheme-to-default-port table.
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Plain => 80,
            Self::Secure => 443,
        }
    }

    pub const fn is_secure(self) -> bool {
        matches!(self, Self::Secure)
    }

    fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("http") {
            Some(Self::Plain)
        } else if token.eq_ignore_ascii_case("https") {
            Some(Self::Secure)
        } else {
            None
        }
    }
}

/// A parsed probe target. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Request path without its leading `/`. May be empty.
    pub path: String,
}

impl Endpoint {
    /// Parse `scheme://host[:port][/path]`.
    pub fn parse(url: &str) -> Result<Self, Error> {
        let (token, rest) = url
            .split_once("://")
            .ok_or_else(|| Error::malformed(url, "missing '://' scheme separator"))?;

        let scheme = Scheme::from_token(token)
            .ok_or_else(|| Error::malformed(url, format!("unsupported scheme '{token}'")))?;

        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));

        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => (host, parse_port(url, port)?),
            None => (authority, scheme.default_port()),
        };

        if host.is_empty() {
            return Err(Error::malformed(url, "empty host"));
        }
        if let Some(c) = host.chars().find(|&c| !is_host_char(c)) {
            return Err(Error::malformed(url, format!("invalid character {c:?} in host")));
        }
        if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(Error::malformed(url, "whitespace or control character in path"));
        }

        Ok(Self {
            scheme,
            host: host.to_owned(),
            port,
            path: path.to_owned(),
        })
    }

    /// Parse `base` with `relative` appended as its path.
    ///
    /// A trailing `/` on the base and a leading `/` on the relative part
    /// are collapsed so `https://h/` + `/api/v1/up` becomes `https://h/api/v1/up`.
    pub fn join(base: &str, relative: &str) -> Result<Self, Error> {
        let url = format!(
            "{}/{}",
            base.trim_end_matches('/'),
            relative.trim_start_matches('/')
        );
        Self::parse(&url)
    }

    /// Resolve the host to a concrete socket address (first result wins).
    pub async fn resolve(&self) -> Result<SocketAddr, Error> {
        let unresolved = || Error::Resolution {
            host: self.host.clone(),
            port: self.port,
        };

        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                debug!(host = %self.host, error = %e, "lookup failed");
                unresolved()
            })?;

        let addr = addrs.next().ok_or_else(unresolved)?;
        debug!(host = %self.host, %addr, "resolved");
        Ok(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if self.port != self.scheme.default_port() {
            write!(f, ":{}", self.port)?;
        }
        write!(f, "/{}", self.path)
    }
}

/// Registered names and IPv4 literals only.
fn is_host_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn parse_port(url: &str, raw: &str) -> Result<u16, Error> {
    match raw.parse::<u16>() {
        Ok(0) => Err(Error::malformed(url, "port must be in 1..=65535")),
        Ok(port) => Ok(port),
        Err(_) => Err(Error::malformed(url, format!("invalid port '{raw}'"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn https_defaults_to_443() {
        let ep = Endpoint::parse("https://oubot.example.dev/api/v1/up").unwrap();
        assert_eq!(ep.scheme, Scheme::Secure);
        assert_eq!(ep.host, "oubot.example.dev");
        assert_eq!(ep.port, 443);
        assert_eq!(ep.path, "api/v1/up");
    }

    #[test]
    fn http_defaults_to_80() {
        let ep = Endpoint::parse("http://10.0.0.5/health").unwrap();
        assert_eq!(ep.scheme, Scheme::Plain);
        assert_eq!(ep.port, 80);
        assert_eq!(ep.path, "health");
    }

    #[test]
    fn explicit_port_overrides_default() {
        let ep = Endpoint::parse("https://monitor.lan:8443/api/v1/up").unwrap();
        assert_eq!(ep.host, "monitor.lan");
        assert_eq!(ep.port, 8443);
    }

    #[test]
    fn missing_path_is_empty() {
        let ep = Endpoint::parse("http://example.com").unwrap();
        assert_eq!(ep.path, "");
        let ep = Endpoint::parse("http://example.com:81").unwrap();
        assert_eq!(ep.port, 81);
        assert_eq!(ep.path, "");
    }

    #[test]
    fn scheme_token_is_case_insensitive() {
        let ep = Endpoint::parse("HTTPS://example.com/").unwrap();
        assert_eq!(ep.scheme, Scheme::Secure);
    }

    #[test]
    fn rejects_missing_separator() {
        for url in ["example.com/api", "https:/example.com", "", "https//x"] {
            let err = Endpoint::parse(url).unwrap_err();
            assert!(matches!(err, Error::MalformedUrl { .. }), "{url}: {err}");
        }
    }

    #[test]
    fn rejects_unsupported_scheme() {
        for url in ["ftp://example.com/x", "ws://example.com", "httpx://example.com"] {
            let err = Endpoint::parse(url).unwrap_err();
            assert!(matches!(err, Error::MalformedUrl { .. }), "{url}: {err}");
        }
    }

    #[test]
    fn rejects_bad_ports() {
        for url in [
            "http://example.com:abc/x",
            "http://example.com:/x",
            "http://example.com:0/x",
            "http://example.com:70000/x",
        ] {
            let err = Endpoint::parse(url).unwrap_err();
            assert!(matches!(err, Error::MalformedUrl { .. }), "{url}: {err}");
        }
    }

    #[test]
    fn rejects_empty_host() {
        assert!(Endpoint::parse("https:///api").is_err());
        assert!(Endpoint::parse("https://:443/api").is_err());
    }

    #[test]
    fn rejects_query_or_fragment_in_authority() {
        for url in [
            "http://example.com?x=1",
            "http://example.com#top",
            "http://user@example.com/up",
            "http://exa mple.com/up",
        ] {
            let err = Endpoint::parse(url).unwrap_err();
            assert!(matches!(err, Error::MalformedUrl { .. }), "{url}: {err}");
        }
        assert!(Endpoint::join("http://example.com?x=1", "api/v1/up").is_err());
    }

    #[test]
    fn query_after_path_is_kept() {
        let ep = Endpoint::parse("http://example.com/up?probe=1").unwrap();
        assert_eq!(ep.host, "example.com");
        assert_eq!(ep.path, "up?probe=1");
    }

    #[test]
    fn rejects_whitespace_in_path() {
        for url in ["http://example.com/a b", "http://example.com/up\r\nX-Evil: 1"] {
            let err = Endpoint::parse(url).unwrap_err();
            assert!(matches!(err, Error::MalformedUrl { .. }), "{url}: {err}");
        }
    }

    #[test]
    fn join_collapses_slashes() {
        let a = Endpoint::join("https://h.example/", "/api/v1/up").unwrap();
        let b = Endpoint::join("https://h.example", "api/v1/up").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path, "api/v1/up");
    }

    #[test]
    fn display_omits_default_port() {
        let ep = Endpoint::parse("https://h.example:443/api/v1/up").unwrap();
        assert_eq!(ep.to_string(), "https://h.example/api/v1/up");
        let ep = Endpoint::parse("http://h.example:8080/up").unwrap();
        assert_eq!(ep.to_string(), "http://h.example:8080/up");
    }

    #[tokio::test]
    async fn resolves_ip_literal() {
        let ep = Endpoint::parse("http://127.0.0.1:9/").unwrap();
        let addr = ep.resolve().await.unwrap();
        assert_eq!(addr, "127.0.0.1:9".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn unresolvable_host_is_resolution_error() {
        let ep = Endpoint::parse("http://does-not-exist.invalid/").unwrap();
        let err = ep.resolve().await.unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }), "{err}");
    }
}
