//! fetchd server binary: wire up config, store, registry, executor,
//! notification hub, and janitor, then serve the HTTP API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use fetchd_core::config::Config;
use fetchd_core::engine::{MediaEngine, YtDlpEngine};
use fetchd_core::executor::{CancelMap, Executor, ExecutorOptions};
use fetchd_core::janitor::{self, JanitorOptions};
use fetchd_core::logging;
use fetchd_core::notify::NotificationHub;
use fetchd_core::registry::JobRegistry;
use fetchd_core::store::JobStore;
use fetchd_server::{create_app, AppState};

/// Self-hosted media download service.
#[derive(Debug, Parser)]
#[command(name = "fetchd")]
#[command(about = "fetchd: media download service", long_about = None)]
struct Cli {
    /// Listen address (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Download directory (overrides DOWNLOAD_DIR).
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Job database path (overrides DATABASE).
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible.
    logging::init();

    if let Err(err) = run().await {
        eprintln!("fetchd error: {:#}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    if let Some(host) = cli.host {
        cfg.host = host;
    }
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    if let Some(dir) = cli.download_dir {
        cfg.download_dir = dir;
    }
    if let Some(db) = cli.db {
        cfg.database = Some(db);
    }
    tracing::debug!("config: {:?}", cfg);

    tokio::fs::create_dir_all(&cfg.download_dir)
        .await
        .with_context(|| format!("create download dir {}", cfg.download_dir.display()))?;

    let store = match &cfg.database {
        Some(path) => JobStore::open_at(path).await.context("open job database")?,
        None => JobStore::open_default().await.context("open job database")?,
    };
    // Jobs stranded by a previous crash become terminal before anyone can
    // observe them as live.
    let interrupted = store.mark_interrupted().await?;
    if interrupted > 0 {
        tracing::warn!("reconciled {interrupted} jobs interrupted by restart");
    }

    let registry = Arc::new(JobRegistry::open(store).await?);
    let hub = Arc::new(NotificationHub::new(Arc::clone(&registry)));
    let cancels = Arc::new(CancelMap::new());
    let engine: Arc<dyn MediaEngine> = Arc::new(YtDlpEngine::new(cfg.ytdlp_bin.clone(), cfg.ytdlp_args.clone()));
    let executor = Executor::spawn(
        Arc::clone(&registry),
        Arc::clone(&hub),
        engine,
        Arc::clone(&cancels),
        ExecutorOptions {
            workers: cfg.workers,
            queue_capacity: cfg.queue_capacity,
            download_dir: cfg.download_dir.clone(),
            public_base_url: cfg.public_base_url.clone(),
        },
    );
    janitor::spawn(
        Arc::clone(&registry),
        Arc::clone(&hub),
        JanitorOptions {
            retention: cfg.retention,
            sweep_interval: cfg.sweep_interval,
            download_dir: cfg.download_dir.clone(),
        },
    );

    let state = Arc::new(AppState {
        registry,
        hub,
        executor,
        cancels,
        download_dir: cfg.download_dir.clone(),
    });
    let app = create_app(state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install ctrl-c handler");
    tracing::info!("shutdown signal received");
}
