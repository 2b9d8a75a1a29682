// Transport session: one TCP connection, optionally wrapped in TLS.
//
// A session is opened for exactly one probe and closed at the end of it.
// Every I/O step is bounded by `TransportConfig::timeout`, so a single
// probe can stall the caller for at most a few timeouts.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadBuf,
};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tracing::{debug, trace};

use crate::error::Error;
use crate::tls;

/// Upper bound on a status line. Anything longer is cut off.
const MAX_LINE_LEN: u64 = 1024;

/// TLS trust policy for secure endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Refuse to open TLS sessions. There is no certificate store to
    /// verify against, so this is the default until the operator opts in.
    #[default]
    Disabled,
    /// Complete the handshake with ANY server certificate.
    ///
    /// Deliberate trust decision for devices without a clock or CA bundle
    /// on a trusted network: the channel is encrypted but the server is
    /// not authenticated.
    DangerAcceptInvalid,
}

/// Shared transport configuration for probe sessions.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Bound on connect, handshake, write and read, each.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(3),
        }
    }
}

impl TransportConfig {
    /// Config that accepts any server certificate.
    pub fn insecure(timeout: Duration) -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout,
        }
    }
}

// ── Stream ───────────────────────────────────────────────────────────

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

// ── TransportSession ─────────────────────────────────────────────────

/// Exclusive owner of one probe connection.
///
/// Dropping the session releases the socket; [`close`](Self::close) does
/// the same after a best-effort shutdown and may be called any number of
/// times.
pub struct TransportSession {
    stream: Option<BufReader<Stream>>,
    peer: SocketAddr,
    timeout: Duration,
}

impl TransportSession {
    /// Connect to `addr`, upgrading to TLS when `use_tls` is set.
    ///
    /// `server_name` is the SNI name sent in the handshake. If the upgrade
    /// fails, the raw TCP stream is owned by the failed handshake and is
    /// dropped with it before this returns.
    pub async fn open(
        addr: SocketAddr,
        use_tls: bool,
        server_name: &str,
        config: &TransportConfig,
    ) -> Result<Self, Error> {
        let connector = if use_tls {
            match config.tls {
                TlsMode::Disabled => {
                    return Err(Error::Tls(
                        "TLS is disabled; certificate verification is unavailable, \
                         opt in with TlsMode::DangerAcceptInvalid"
                            .into(),
                    ));
                }
                TlsMode::DangerAcceptInvalid => {
                    Some((tls::insecure_connector()?, tls::server_name(server_name)?))
                }
            }
        } else {
            None
        };

        let tcp = bounded("connect", config.timeout, async {
            TcpStream::connect(addr)
                .await
                .map_err(|source| Error::Connect { addr, source })
        })
        .await?;
        trace!(%addr, "tcp connected");

        let stream = match connector {
            Some((connector, name)) => {
                let tls = bounded("tls handshake", config.timeout, async {
                    connector
                        .connect(name, tcp)
                        .await
                        .map_err(|e| Error::Tls(format!("handshake with {addr} failed: {e}")))
                })
                .await?;
                Stream::Tls(Box::new(tls))
            }
            None => Stream::Plain(tcp),
        };

        debug!(%addr, tls = use_tls, "session opened");
        Ok(Self {
            stream: Some(BufReader::new(stream)),
            peer: addr,
            timeout: config.timeout,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Write all of `bytes` and flush.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let timeout = self.timeout;
        let stream = self.stream_mut("write")?;
        bounded("write", timeout, async {
            stream.write_all(bytes).await.map_err(io_error("write"))?;
            stream.flush().await.map_err(io_error("write"))
        })
        .await
    }

    /// Read up to and including the next `\n`.
    ///
    /// Returns an empty buffer if the peer closed first. Lines longer
    /// than 1 KiB are truncated.
    pub async fn read_line(&mut self) -> Result<Vec<u8>, Error> {
        let timeout = self.timeout;
        let stream = self.stream_mut("read")?;
        let mut line = Vec::new();
        bounded("read", timeout, async {
            stream
                .take(MAX_LINE_LEN)
                .read_until(b'\n', &mut line)
                .await
                .map_err(io_error("read"))
        })
        .await?;
        trace!(len = line.len(), "line read");
        Ok(line)
    }

    /// Shut the stream down and release the socket. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            // Best effort: the peer may already be gone.
            let _ = tokio::time::timeout(self.timeout, stream.shutdown()).await;
            debug!(addr = %self.peer, "session closed");
        }
    }

    fn stream_mut(&mut self, op: &'static str) -> Result<&mut BufReader<Stream>, Error> {
        self.stream.as_mut().ok_or_else(|| Error::Io {
            op,
            source: io::Error::from(io::ErrorKind::NotConnected),
        })
    }
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("peer", &self.peer)
            .field(
                "tls",
                &matches!(
                    self.stream.as_ref().map(BufReader::get_ref),
                    Some(Stream::Tls(_))
                ),
            )
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Run `fut`, turning an elapsed deadline into [`Error::Timeout`].
async fn bounded<T>(
    op: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| Error::Timeout { op, after })?
}

fn io_error(op: &'static str) -> impl FnOnce(io::Error) -> Error {
    move |source| Error::Io { op, source }
}
