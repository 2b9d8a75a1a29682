// upbeat-core: keeps the link up and the monitor informed.

pub mod association;
pub mod config;
pub mod error;
pub mod indicator;
pub mod prober;
pub mod radio;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use association::{Association, AssociationOutcome, AssociationState};
pub use config::{AgentConfig, Backoff, LinkBackend, NetworkCredentials};
pub use error::{CoreError, ErrorKind};
pub use indicator::{Indicator, LogIndicator, SysfsLed};
pub use prober::{HttpProber, ProbeOutcome, Prober};
pub use radio::{NetworkManager, Radio, RadioError, StaticLink};
pub use supervisor::{Phase, StepOutcome, StepReport, Supervisor};

// Wire-level types callers need to build an `AgentConfig`.
pub use upbeat_api::{LIVENESS_PATH, Method, ProbeRequest, StatusLine, TlsMode, TransportConfig};
