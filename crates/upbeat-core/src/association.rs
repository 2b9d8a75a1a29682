// ── Wireless association state machine ──
//
// Idle → Associating → Associated | Failed. One run activates the radio,
// then polls the link status until it reaches a terminal code. Only
// `LINK_UP` counts as success; every other terminal code is a failure.

use std::time::Duration;

use strum::Display;
use tracing::{debug, info, warn};

use crate::config::NetworkCredentials;
use crate::indicator::Indicator;
use crate::radio::{LINK_UP, Radio, RadioError, is_terminal, status_label};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AssociationState {
    Idle,
    Associating,
    Associated,
    Failed,
}

/// How one association attempt ended.
#[derive(Debug)]
pub enum AssociationOutcome {
    /// The link came up.
    Associated { status: i32 },
    /// The link reached a terminal failure code.
    Rejected { status: i32 },
    /// The radio refused to activate or to start joining.
    ActivationFailed(RadioError),
}

impl AssociationOutcome {
    pub fn is_associated(&self) -> bool {
        matches!(self, Self::Associated { .. })
    }
}

#[derive(Debug)]
pub struct Association {
    state: AssociationState,
    last_status: Option<i32>,
    polls: u32,
}

impl Default for Association {
    fn default() -> Self {
        Self::new()
    }
}

impl Association {
    pub fn new() -> Self {
        Self {
            state: AssociationState::Idle,
            last_status: None,
            polls: 0,
        }
    }

    pub fn state(&self) -> AssociationState {
        self.state
    }

    /// Last raw status observed during the current or previous attempt.
    pub fn last_status(&self) -> Option<i32> {
        self.last_status
    }

    /// Status polls made during the current or previous attempt.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Run one attempt to completion.
    ///
    /// The indicator is on while the radio is being driven or queried and
    /// off while waiting between polls. It is left on when this returns.
    pub async fn run<R, I>(
        &mut self,
        radio: &mut R,
        network: &NetworkCredentials,
        poll_interval: Duration,
        indicator: &mut I,
    ) -> AssociationOutcome
    where
        R: Radio,
        I: Indicator,
    {
        self.state = AssociationState::Idle;
        self.last_status = None;
        self.polls = 0;

        indicator.set(true);
        info!(ssid = %network.ssid, "activating radio");
        if let Err(e) = radio.activate(network).await {
            warn!(error = %e, "radio activation failed");
            self.state = AssociationState::Failed;
            return AssociationOutcome::ActivationFailed(e);
        }
        self.state = AssociationState::Associating;

        let status = loop {
            indicator.set(true);
            let status = radio.status().await;
            self.polls += 1;
            self.last_status = Some(status);
            if is_terminal(status) {
                break status;
            }
            debug!(status, label = status_label(status), polls = self.polls, "associating");
            indicator.set(false);
            tokio::time::sleep(poll_interval).await;
        };
        indicator.set(true);

        if status == LINK_UP {
            self.state = AssociationState::Associated;
            info!(polls = self.polls, "associated");
            AssociationOutcome::Associated { status }
        } else {
            self.state = AssociationState::Failed;
            warn!(status, label = status_label(status), "association failed");
            AssociationOutcome::Rejected { status }
        }
    }
}
