// upbeat-api: minimal HTTP/1.0 liveness-probe client over raw TCP/TLS streams

pub mod endpoint;
pub mod error;
pub mod probe;
pub mod request;
pub mod transport;

mod tls;

pub use endpoint::{Endpoint, Scheme};
pub use error::{Error, ErrorKind};
pub use probe::{LIVENESS_PATH, ProbeRequest, StatusLine, probe};
pub use request::{Method, encode_request};
pub use transport::{TlsMode, TransportConfig, TransportSession};
