//! lingoguessr-engine: game engine for the LingoGuessr listening game
//!
//! The engine runs beside a thin UI shell and provides:
//! - The five-screen game state machine (Home, RegionSelect, Playing,
//!   Results, Settings)
//! - Round selection with the once-per-day Daily gate
//! - Content service calls for sentences, speech, clues and hints
//! - IPC server for the shell to send actions and receive snapshots
//!
//! The shell owns rendering and sound output; the engine owns every rule.

mod audio;
mod catalog;
mod config;
mod content;
mod events;
mod ipc;
mod lifecycle;
mod round;
mod state;
mod store;

use std::sync::Arc;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::{AudioEngine, PacedSink};
use crate::config::Config;
use crate::content::HttpContentProvider;
use crate::events::GameEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::round::{RoundSelector, SystemClock};
use crate::state::GameMachine;
use crate::store::{FileStore, KeyValueStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "lingoguessr-engine starting"
    );

    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        content_url = %config.content_url,
        "configuration loaded"
    );

    let store: Arc<dyn KeyValueStore> = if config.ephemeral {
        warn!("ephemeral mode, daily record will not survive a restart");
        Arc::new(MemoryStore::new())
    } else {
        let store = FileStore::new(config.records_path());
        info!(path = ?store.path(), "record store opened");
        Arc::new(store)
    };

    let provider = Arc::new(HttpContentProvider::new(
        &config.content_url,
        config.api_key.clone(),
        config.request_timeout,
    )?);

    let audio = Arc::new(AudioEngine::new(Arc::new(PacedSink)));

    let mut selector = RoundSelector::new(provider.clone(), store, Arc::new(SystemClock));
    if let Some(seed) = config.seed {
        info!(seed, "using fixed seed for target draws");
        selector = selector.with_rng(StdRng::seed_from_u64(seed));
    }

    // Shell requests -> engine loop
    let (command_tx, command_rx) = mpsc::channel(32);
    // Engine loop -> subscribed shells
    let (event_tx, _) = broadcast::channel::<GameEvent>(64);

    let mut machine = GameMachine::new(selector, provider, audio, event_tx.clone());

    let server = Server::new(&config.socket_path, command_tx, event_tx.clone())?;

    let mut log_rx = event_tx.subscribe();
    let shutdown = ShutdownSignal::new();

    info!("engine initialized, entering main loop");

    tokio::select! {
        _ = machine.run(command_rx) => {
            info!("game machine exited");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = async {
            loop {
                match log_rx.recv().await {
                    Ok(event) => info!(%event, "game event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "game event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("game event logger exited");
        }

        _ = async {
            if let Err(e) = shutdown.wait().await {
                error!(?e, "signal handling unavailable, running until the server stops");
                std::future::pending::<()>().await;
            }
        } => {
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");

    server.shutdown().await;

    info!("lingoguessr-engine stopped");

    Ok(())
}
