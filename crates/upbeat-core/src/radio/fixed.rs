use tracing::debug;

use super::{LINK_UP, Radio, RadioError};
use crate::config::NetworkCredentials;

/// A link managed outside the agent (wired, or joined by the OS).
///
/// Activation does nothing and the link always reports [`LINK_UP`], so
/// the supervisor goes straight to probing.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticLink;

impl Radio for StaticLink {
    async fn activate(&mut self, _network: &NetworkCredentials) -> Result<(), RadioError> {
        debug!("static link, nothing to activate");
        Ok(())
    }

    async fn status(&mut self) -> i32 {
        LINK_UP
    }

    async fn address(&mut self) -> Option<String> {
        None
    }
}
