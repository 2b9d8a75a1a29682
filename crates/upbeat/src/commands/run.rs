//! `upbeat run`: the supervisor loop, until Ctrl-C or SIGTERM.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use upbeat_config::IndicatorTarget;
use upbeat_core::{
    AgentConfig, HttpProber, LinkBackend, LogIndicator, NetworkManager, Radio, StaticLink,
    Supervisor, SysfsLed,
};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (cfg, agent) = config::agent_config(global)?;
    let led = cfg.indicator.target();

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    match agent.link.clone() {
        LinkBackend::NetworkManager { interface } => {
            supervise(agent, NetworkManager::new(interface), led, cancel).await;
        }
        LinkBackend::Static => supervise(agent, StaticLink, led, cancel).await,
    }
    Ok(())
}

async fn supervise<R: Radio>(
    agent: AgentConfig,
    radio: R,
    led: IndicatorTarget,
    cancel: CancellationToken,
) {
    let prober = HttpProber::from_config(&agent);
    match led {
        IndicatorTarget::LogOnly => {
            Supervisor::new(agent, radio, prober, LogIndicator::default())
                .run(cancel)
                .await;
        }
        IndicatorTarget::Named(name) => {
            Supervisor::new(agent, radio, prober, SysfsLed::named(&name))
                .run(cancel)
                .await;
        }
        IndicatorTarget::Path(dir) => {
            Supervisor::new(agent, radio, prober, SysfsLed::at(dir))
                .run(cancel)
                .await;
        }
    }
}

// ── Shutdown ─────────────────────────────────────────────────────────

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown requested, stopping after the current step");
        cancel.cancel();
    });
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            return ctrl_c().await;
        }
    };
    tokio::select! {
        () = ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
