use std::process;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use roombot::brain::reload::{watch_brain_dirs, BrainReloadCoordinator, EngineFactory};
use roombot::brain::rules::RulesEngine;
use roombot::brain::VariableStore;
use roombot::client::session::ExitReason;
use roombot::client::transport::spawn_stdio_transport;
use roombot::config::BotConfig;
use roombot::Reactor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("configuration error: {error}");
            process::exit(1);
        }
    };

    init_tracing(&config);
    info!(character = %config.character, "roombot starting");

    let store = VariableStore::new(config.prefix());
    let factory: EngineFactory = Box::new(|| Box::new(RulesEngine::new()));
    let brain = match BrainReloadCoordinator::bootstrap(
        factory,
        config.brain_dir.clone(),
        config.overlay_brain_dir(),
        store,
    ) {
        Ok(brain) => brain,
        Err(error) => {
            error!(%error, "fatal brain load failure");
            process::exit(ExitReason::BrainLoadFailed.status_code());
        }
    };

    let (watch_tx, watch_rx) = mpsc::channel(16);
    // An unwatchable setup downgrades to running without live reload.
    if let Err(error) = watch_brain_dirs(
        vec![config.brain_dir.clone(), config.overlay_brain_dir()],
        watch_tx,
    )
    .context("setting up brain watcher")
    {
        debug!(%error, "live brain reload disabled");
    }

    let transport = spawn_stdio_transport();
    let mut reactor = Reactor::new(&config, transport.events, transport.actions, brain, watch_rx);

    let termination = reactor.run().await;
    info!(reason = ?termination.reason, "session ended");
    process::exit(termination.reason.status_code());
}

fn init_tracing(config: &BotConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
