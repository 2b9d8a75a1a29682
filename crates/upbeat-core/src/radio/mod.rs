//! Link-layer seam.
//!
//! A [`Radio`] activates the wireless interface, starts joining a network
//! and reports a raw numeric link status. The association state machine
//! only ever sees those codes; backends translate whatever their platform
//! reports into the table below.

use std::future::Future;

use thiserror::Error;

use crate::config::NetworkCredentials;

mod fixed;
mod nm;

pub use fixed::StaticLink;
pub use nm::NetworkManager;

// ── Link status codes ────────────────────────────────────────────────

/// Not connected, nothing in progress yet.
pub const LINK_DOWN: i32 = 0;
/// Joining the network.
pub const LINK_JOIN: i32 = 1;
/// Joined, waiting for an address.
pub const LINK_NOIP: i32 = 2;
/// Joined with an address ("got IP").
pub const LINK_UP: i32 = 3;
/// Generic failure.
pub const LINK_FAIL: i32 = -1;
/// Network not found or interface unavailable.
pub const LINK_NONET: i32 = -2;
/// Authentication rejected.
pub const LINK_BADAUTH: i32 = -3;

/// `true` once a status code means the attempt has concluded.
pub const fn is_terminal(status: i32) -> bool {
    status < 0 || status >= LINK_UP
}

/// Short label for logs.
pub const fn status_label(status: i32) -> &'static str {
    match status {
        LINK_DOWN => "down",
        LINK_JOIN => "joining",
        LINK_NOIP => "no_ip",
        LINK_UP => "up",
        LINK_FAIL => "fail",
        LINK_NONET => "no_network",
        LINK_BADAUTH => "bad_auth",
        _ => "unknown",
    }
}

// ── Radio ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RadioError {
    /// The link layer refused to activate or to start joining.
    #[error("radio activation failed: {0}")]
    Activation(String),

    /// A helper program could not be run at all.
    #[error("failed to run {program}: {source}")]
    Command {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A helper program did not answer in time.
    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },
}

/// Wireless link control.
///
/// Single-threaded: the supervisor holds the only `&mut`.
pub trait Radio {
    /// Power the interface up and start joining `network`.
    ///
    /// Must return once the join is *initiated*; completion is observed
    /// through [`status`](Self::status).
    fn activate(
        &mut self,
        network: &NetworkCredentials,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Current link status code. Backends that cannot determine the
    /// status report [`LINK_FAIL`] rather than an in-progress code.
    fn status(&mut self) -> impl Future<Output = i32>;

    /// Local address once associated, for logs.
    fn address(&mut self) -> impl Future<Output = Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_range() {
        assert!(!is_terminal(LINK_DOWN));
        assert!(!is_terminal(LINK_JOIN));
        assert!(!is_terminal(LINK_NOIP));
        assert!(is_terminal(LINK_UP));
        assert!(is_terminal(4));
        assert!(is_terminal(LINK_FAIL));
        assert!(is_terminal(LINK_BADAUTH));
    }

    #[test]
    fn labels() {
        assert_eq!(status_label(LINK_UP), "up");
        assert_eq!(status_label(-3), "bad_auth");
        assert_eq!(status_label(42), "unknown");
    }
}
