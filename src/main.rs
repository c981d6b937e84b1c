use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use bellhop::config::BotConfig;
use bellhop::connection::ConnectionSupervisor;
use bellhop::llm_client::CompletionClient;
use bellhop::memory;
use bellhop::persona::PersonaLibrary;
use bellhop::pipeline::Pipeline;
use bellhop::routines::RoutineScheduler;
use bellhop::world::WorldStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,bellhop=debug")),
        )
        .init();

    tracing::info!("Bellhop starting...");
    let config = BotConfig::load();

    // Both stores must answer before any turn runs; failing here is fatal.
    let store = Arc::new(
        WorldStore::open(&config.database_path).context("World database unavailable")?,
    );
    let memory = memory::connect_store(&config)
        .await
        .context("Short-term memory store unavailable")?;

    let personas = Arc::new(PersonaLibrary::new(&config.persona_dir));
    let completer = Arc::new(CompletionClient::new(
        config.llm_api_url.clone(),
        config.llm_model.clone(),
    ));
    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        personas.clone(),
        memory,
        completer,
        config.memory_ttl_secs,
    ));

    let (outbound_tx, outbound_rx) = flume::bounded(64);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler = RoutineScheduler::new(store, personas, outbound_tx, shutdown_rx.clone());
    let scheduler_task = tokio::spawn(scheduler.run());

    let supervisor = ConnectionSupervisor::new(
        config.ws_url.clone(),
        Duration::from_secs(config.reconnect_delay_secs),
        pipeline,
        outbound_rx,
        shutdown_rx,
    );
    let supervisor_task = tokio::spawn(supervisor.run());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    let _ = supervisor_task.await;
    let _ = scheduler_task.await;
    Ok(())
}
