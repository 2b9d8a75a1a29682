//! `upbeat probe`: one request, no association, no retry.

use upbeat_core::{CoreError, HttpProber, Prober};

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let agent = config::probe_config(global)?;
    let mut prober = HttpProber::from_config(&agent);

    tracing::debug!(url = %agent.probe.base_url, path = %agent.probe.path, "probing once");
    let line = prober.probe().await.map_err(|e| {
        let err = CoreError::from(e);
        if let Some(kind) = err.kind() {
            tracing::debug!(%kind, error = %err, "probe failed");
        }
        err
    })?;
    println!("{line}");
    Ok(())
}
