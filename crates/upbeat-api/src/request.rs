// HTTP/1.0 request head encoding.
//
// HTTP/1.0 keeps the peer from using keep-alive or chunked bodies, so the
// client never needs response framing: it reads one line and hangs up.

use crate::endpoint::Endpoint;

/// Request method. The request never carries a body, whatever the method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
}

/// Encode the complete request head:
///
/// ```text
/// <METHOD> /<path> HTTP/1.0\r\n
/// Host: <host>\r\n
/// [Authorization: <token>\r\n]
/// \r\n
/// ```
pub fn encode_request(method: Method, endpoint: &Endpoint, token: Option<&str>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64 + endpoint.path.len() + endpoint.host.len());

    buf.extend_from_slice(method.to_string().as_bytes());
    buf.extend_from_slice(b" /");
    buf.extend_from_slice(endpoint.path.as_bytes());
    buf.extend_from_slice(b" HTTP/1.0\r\nHost: ");
    buf.extend_from_slice(endpoint.host.as_bytes());
    buf.extend_from_slice(b"\r\n");

    if let Some(token) = token {
        buf.extend_from_slice(b"Authorization: ");
        buf.extend_from_slice(token.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf.extend_from_slice(b"\r\n");
    buf
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::endpoint::Scheme;

    fn endpoint() -> Endpoint {
        Endpoint {
            scheme: Scheme::Secure,
            host: "example.com".into(),
            port: 443,
            path: "api/v1/up".into(),
        }
    }

    #[test]
    fn get_with_token() {
        let bytes = encode_request(Method::Get, &endpoint(), Some("abc123"));
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "GET /api/v1/up HTTP/1.0\r\nHost: example.com\r\nAuthorization: abc123\r\n\r\n"
        );
    }

    #[test]
    fn without_token_omits_authorization() {
        let bytes = encode_request(Method::Get, &endpoint(), None);
        assert_eq!(
            bytes.as_slice(),
            b"GET /api/v1/up HTTP/1.0\r\nHost: example.com\r\n\r\n".as_slice()
        );
    }

    #[test]
    fn method_is_a_parameter() {
        let bytes = encode_request(Method::Head, &endpoint(), None);
        assert!(bytes.starts_with(b"HEAD /api/v1/up HTTP/1.0\r\n"));
    }

    #[test]
    fn empty_path_requests_root() {
        let ep = Endpoint::parse("http://example.com").unwrap();
        let bytes = encode_request(Method::Get, &ep, None);
        assert!(bytes.starts_with(b"GET / HTTP/1.0\r\n"));
    }

    #[test]
    fn method_parses_from_config_strings() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Post);
        assert!("TRACE".parse::<Method>().is_err());
    }
}
