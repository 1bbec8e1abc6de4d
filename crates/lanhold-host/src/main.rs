//! LanHold host entry point.
//!
//! A headless shell around one [`BroadcastSession`].  The controlling
//! application writes one JSON method call per line to stdin and reads one
//! JSON response per line from stdout.  Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! lanhold-host [OPTIONS]
//!
//! Options:
//!   --config    <PATH>   TOML config file [default: platform config dir]
//!   --log-level <LEVEL>  Overrides `[host] log_level`
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load config
//!  └─ NoopHoldPlatform ─► ResourceLockManager ─► BroadcastChannel ─► BroadcastSession
//!  └─ stdin reader      -- applies each call in arrival order; a send's
//!                          completion is awaited on its own task
//!  └─ stdout writer     -- serialises responses from the reader and send tasks
//!  └─ EOF / Ctrl-C      -- session.shutdown(), exactly once
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lanhold_host::application::session::BroadcastSession;
use lanhold_host::infrastructure::control_bridge::{
    dispatch, encode_response, parse_line, Dispatched,
};
use lanhold_host::infrastructure::holds::{
    lock_manager::HoldTags, noop::NoopHoldPlatform, ResourceLockManager,
};
use lanhold_host::infrastructure::network::BroadcastChannel;
use lanhold_host::infrastructure::storage::config::{
    load_config, load_config_from, AppConfig, ConfigError,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// LanHold host: power-held broadcast channel driven over JSON lines.
#[derive(Debug, Parser)]
#[command(
    name = "lanhold-host",
    about = "Keeps a LAN broadcast channel usable under power holds, driven over stdin/stdout",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    ///
    /// Defaults to `config.toml` in the platform config directory.  A missing
    /// file means all defaults.
    #[arg(long, env = "LANHOLD_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (`error`, `warn`, `info`, `debug`, `trace`).
    ///
    /// `RUST_LOG` still wins when set.
    #[arg(long, env = "LANHOLD_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => match load_config() {
            Ok(cfg) => cfg,
            Err(ConfigError::NoPlatformConfigDir) => AppConfig::default(),
            Err(e) => return Err(e).context("failed to load config"),
        },
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| loaded.host.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .with_writer(std::io::stderr)
        .init();

    info!("LanHold host starting");

    let channel_config = loaded
        .network
        .channel_config()
        .context("invalid [network] configuration")?;
    let locks = ResourceLockManager::new(
        Arc::new(NoopHoldPlatform::new()),
        HoldTags::from(&loaded.holds),
    );
    let channel = Arc::new(BroadcastChannel::new(locks, channel_config));
    let session = BroadcastSession::new(channel);

    // ── Response writer ───────────────────────────────────────────────────────
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = resp_rx.recv().await {
            if let Err(e) = write_line(&mut stdout, &line).await {
                error!("failed to write response: {e}");
                break;
            }
        }
    });

    // ── Request reader ────────────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut sends = JoinSet::new();

    info!("LanHold host ready; reading method calls from stdin");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("shutdown signal received");
                break;
            }
            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let call = match parse_line(&line) {
                        Ok(call) => call,
                        Err(resp) => {
                            warn!("unreadable input line");
                            let _ = resp_tx.send(encode_response(&resp));
                            continue;
                        }
                    };
                    match dispatch(&session, call) {
                        Dispatched::Done(resp) => {
                            let _ = resp_tx.send(encode_response(&resp));
                        }
                        sending => {
                            let tx = resp_tx.clone();
                            sends.spawn(async move {
                                let resp = sending.into_response().await;
                                let _ = tx.send(encode_response(&resp));
                            });
                        }
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    break;
                }
                Err(e) => {
                    error!("failed to read stdin: {e}");
                    break;
                }
            },
        }
    }

    // Teardown: close the channel and release the holds, then let any sends
    // still in flight report back before the writer stops.
    session.shutdown();
    while let Some(joined) = sends.join_next().await {
        if let Err(e) = joined {
            warn!("send task ended abnormally: {e}");
        }
    }
    drop(resp_tx);
    if let Err(e) = writer.await {
        warn!("response writer ended abnormally: {e}");
    }

    info!("LanHold host stopped");
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
