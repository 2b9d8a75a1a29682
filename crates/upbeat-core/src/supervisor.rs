//! The probe supervisor.
//!
//! Composes association and probing into one unbounded loop driven by a
//! single [`Phase`] tag:
//!
//! ```text
//! NeedAssociation ──associated──▶ NeedProbe ──ok / failed──▶ NeedProbe
//!        ▲   │
//!        └───┘ rejected / activation error
//! ```
//!
//! Every failure becomes "wait the named backoff and retry"; nothing is
//! fatal. A probe failure never sends the loop back to association.
//!
//! The indicator is on while something blocking is in flight. Before any
//! sleep it is off after a success and held on after a failure, so a
//! healthy device blinks once per cycle and a failing one stays lit.

use std::fmt;
use std::time::Duration;

use strum::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::association::{Association, AssociationOutcome};
use crate::config::AgentConfig;
use crate::error::ErrorKind;
use crate::indicator::Indicator;
use crate::prober::{ProbeOutcome, Prober};
use crate::radio::Radio;

/// Consecutive failures after which they are logged at `error`.
pub const FAILURE_STREAK_ALERT: u32 = 5;

/// What the next step will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    NeedAssociation,
    NeedProbe,
}

/// What one step observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Associated { address: Option<String> },
    AssociationFailed { status: i32 },
    ActivationFailed { message: String },
    Probed(ProbeOutcome),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Associated { .. } => false,
            Self::AssociationFailed { .. } | Self::ActivationFailed { .. } => true,
            Self::Probed(probe) => !probe.succeeded,
        }
    }
}

/// Result of [`Supervisor::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Phase the step ran in.
    pub phase: Phase,
    pub outcome: StepOutcome,
    /// Phase the next step will run in.
    pub next: Phase,
    /// Wait before the next step.
    pub backoff: Duration,
}

pub struct Supervisor<R, P, I> {
    config: AgentConfig,
    radio: R,
    prober: P,
    indicator: I,
    association: Association,
    phase: Phase,
    streak: u32,
    probes: u64,
}

impl<R, P, I> fmt::Debug for Supervisor<R, P, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("phase", &self.phase)
            .field("association", &self.association.state())
            .field("streak", &self.streak)
            .field("probes", &self.probes)
            .finish_non_exhaustive()
    }
}

impl<R, P, I> Supervisor<R, P, I>
where
    R: Radio,
    P: Prober,
    I: Indicator,
{
    pub fn new(config: AgentConfig, radio: R, prober: P, indicator: I) -> Self {
        Self {
            config,
            radio,
            prober,
            indicator,
            association: Association::new(),
            phase: Phase::NeedAssociation,
            streak: 0,
            probes: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Consecutive failures in the current phase.
    pub fn failure_streak(&self) -> u32 {
        self.streak
    }

    /// Run the current phase once. Does not sleep; the returned report says
    /// how long to wait before the next step.
    pub async fn step(&mut self) -> StepReport {
        let phase = self.phase;
        let (outcome, next, backoff) = match phase {
            Phase::NeedAssociation => self.associate().await,
            Phase::NeedProbe => self.probe().await,
        };
        if next != phase {
            info!(from = %phase, to = %next, "phase change");
        }
        self.phase = next;
        StepReport {
            phase,
            outcome,
            next,
            backoff,
        }
    }

    /// Loop until `cancel` fires.
    ///
    /// Cancellation is observed between steps and during backoff sleeps;
    /// an association attempt or probe already in flight runs to completion.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(url = %self.config.probe.base_url, "supervisor started");

        while !cancel.is_cancelled() {
            let report = self.step().await;
            if !report.backoff.is_zero() {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(report.backoff) => {}
                }
            }

            // End of a fault hold.
            if report.outcome.is_failure() {
                self.indicator.set(false);
            }
        }

        self.indicator.set(false);
        info!(probes = self.probes, "supervisor stopped");
    }

    async fn associate(&mut self) -> (StepOutcome, Phase, Duration) {
        let backoff = self.config.backoff;
        let outcome = self
            .association
            .run(
                &mut self.radio,
                &self.config.network,
                backoff.poll_interval,
                &mut self.indicator,
            )
            .await;

        match outcome {
            AssociationOutcome::Associated { .. } => {
                self.streak = 0;
                let address = self.radio.address().await;
                info!(
                    ssid = %self.config.network.ssid,
                    address = address.as_deref().unwrap_or("unknown"),
                    "link up"
                );
                (StepOutcome::Associated { address }, Phase::NeedProbe, Duration::ZERO)
            }
            AssociationOutcome::Rejected { status } => {
                self.indicator.set(true);
                self.note_failure(ErrorKind::Association, &format!("link status {status}"));
                (
                    StepOutcome::AssociationFailed { status },
                    Phase::NeedAssociation,
                    backoff.association_failed,
                )
            }
            AssociationOutcome::ActivationFailed(e) => {
                self.indicator.set(true);
                self.note_failure(ErrorKind::Association, &e);
                (
                    StepOutcome::ActivationFailed {
                        message: e.to_string(),
                    },
                    Phase::NeedAssociation,
                    backoff.activation_error,
                )
            }
        }
    }

    async fn probe(&mut self) -> (StepOutcome, Phase, Duration) {
        self.indicator.set(true);
        let result = self.prober.probe().await;
        self.probes += 1;
        let outcome = ProbeOutcome::from(&result);

        match result {
            Ok(line) => {
                self.indicator.set(false);
                if self.streak > 0 || self.probes == 1 {
                    info!(status = %line, after_failures = self.streak, "monitor reachable");
                } else {
                    debug!(status = %line, probes = self.probes, "probe ok");
                }
                self.streak = 0;
                (
                    StepOutcome::Probed(outcome),
                    Phase::NeedProbe,
                    self.config.backoff.probe_interval,
                )
            }
            Err(e) => {
                self.note_failure(e.kind(), &e);
                (
                    StepOutcome::Probed(outcome),
                    Phase::NeedProbe,
                    self.config.backoff.probe_failed,
                )
            }
        }
    }

    fn note_failure(&mut self, kind: ErrorKind, err: &dyn fmt::Display) {
        self.streak += 1;
        let phase = self.phase;
        if self.streak >= FAILURE_STREAK_ALERT {
            error!(%phase, %kind, streak = self.streak, error = %err, "still failing");
        } else {
            warn!(%phase, %kind, streak = self.streak, error = %err, "step failed");
        }
    }
}
