//! Tentacle server binary: TCP frontend over the engine and bridge.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tentacle_compiler::{CompileBridge, GraphChecker};
use tentacle_runtime::{TentacleConfig, TentacleEngine};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Graph command pipeline server.
#[derive(Debug, Parser)]
#[command(name = "tentacle", version, about)]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides config and environment.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = TentacleConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let debounce = config.debounce();
    let timeout = config.compile_timeout();
    let listen_addr = config.listen_addr.clone();

    let (engine, commits) = TentacleEngine::start_with_commits(config);
    let bridge = CompileBridge::new(
        commits,
        engine.router().clone(),
        Arc::new(GraphChecker),
        debounce,
        timeout,
    );
    let bridge_task = tokio::spawn(bridge.run());

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    info!(addr = %listen_addr, "listening");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, peer)) => {
                        if let Err(e) = socket.set_nodelay(true) {
                            warn!(%peer, "set_nodelay failed: {e}");
                        }
                        let (read, write) = socket.into_split();
                        let stream = engine.attach_stream(read, write);
                        info!(%peer, %stream, "connection accepted");
                    }
                    Err(e) => warn!("accept failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    engine.shutdown().await;
    let _ = bridge_task.await;
    Ok(())
}
