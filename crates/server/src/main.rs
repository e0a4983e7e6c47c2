mod bootstrap;
mod scheduler;

use anyhow::Result;
use curio_core::config::{AppConfig, LoadOptions};
use curio_core::{spawn_consumers, BatchSettings, EventConsumer};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use curio_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let cancel = CancellationToken::new();

    let mut consumers =
        spawn_consumers(&app.broker, EventConsumer::new(app.service.clone()), &cancel)?;

    let scheduler = app.config.scheduler.enabled.then(|| {
        tokio::spawn(scheduler::run_batch_loop(
            app.service.clone(),
            BatchSettings::from(&app.config.scheduler),
            app.config.scheduler.interval(),
            cancel.clone(),
        ))
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        scheduler_enabled = app.config.scheduler.enabled,
        "curio-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "curio-server stopping"
    );

    cancel.cancel();
    if let Some(scheduler) = scheduler {
        if let Err(error) = scheduler.await {
            tracing::warn!(
                event_name = "system.server.scheduler_aborted",
                error = %error,
                "scheduler task ended abnormally"
            );
        }
    }
    while consumers.join_next().await.is_some() {}

    app.broker.close();
    app.db_pool.close().await;
    tracing::info!(event_name = "system.server.stopped", correlation_id = "shutdown", "curio-server stopped");

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
