mod app;
mod cycles;
mod settings;

use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use taskvisor::{Config as SupervisorConfig, ControllerConfig, Subscribe, Supervisor};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ca_api::serve_health;
use ca_observe::{EventLogger, capture_local_offset, init_logger};

use crate::{
    cycles::{status_cycle, submit_cycle},
    settings::AgentSettings,
};

fn main() -> anyhow::Result<()> {
    let settings = AgentSettings::parse();

    // The local offset can only be read while the process is single-threaded.
    capture_local_offset();
    init_logger(&settings.log_config())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(settings))
}

async fn run(settings: AgentSettings) -> anyhow::Result<()> {
    info!(
        api = %settings.base_api_url,
        slurmrestd = %settings.base_slurmrestd_url,
        mapper = %settings.user_mapper,
        "starting cluster agent"
    );
    let agent = app::build(&settings).await?;

    let shutdown = CancellationToken::new();
    let health = tokio::spawn(serve_health(
        settings.health_addr,
        shutdown.clone().cancelled_owned(),
    ));

    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(EventLogger)];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subscribers)
        .with_controller(ControllerConfig::default())
        .build();

    let runner = Arc::clone(&sup);
    let mut supervised = tokio::spawn(async move { runner.run(Vec::new()).await });
    sup.wait_ready().await;

    sup.submit(submit_cycle(
        agent.coordinator,
        settings.submit_interval(),
        settings.cycle_timeout(),
    ))
    .await
    .map_err(|e| anyhow!("could not schedule submit cycle: {e}"))?;
    sup.submit(status_cycle(
        agent.tracker,
        settings.status_interval(),
        settings.cycle_timeout(),
    ))
    .await
    .map_err(|e| anyhow!("could not schedule status cycle: {e}"))?;
    info!("agent cycles scheduled");

    let outcome = tokio::select! {
        res = &mut supervised => match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(anyhow!("supervisor exited: {e}")),
            Err(e) => Err(anyhow!("supervisor task panicked: {e}")),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    };

    shutdown.cancel();
    match health.await {
        Ok(Err(e)) => error!(error = %e, "health endpoint failed"),
        Err(e) => error!(error = %e, "health endpoint panicked"),
        Ok(Ok(())) => {}
    }
    info!("cluster agent stopped");
    outcome
}
