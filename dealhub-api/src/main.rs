//! dealhub-api - price comparison, alert and affiliate service
//!
//! Serves the comparison API used by the web front end and the browser
//! extension, and runs the periodic price refresh.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dealhub_common::cache::{Cache, MemoryCache, RedisCache};
use dealhub_common::config::{ConfigOverrides, DealhubConfig};
use dealhub_common::db::init_database;
use dealhub_api::services::EstimatedPriceSource;
use dealhub_api::{build_router, scheduler, ApiSettings, AppState};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for dealhub-api
#[derive(Parser, Debug)]
#[command(name = "dealhub-api")]
#[command(about = "Price comparison and alert service for DealHub")]
#[command(version)]
struct Args {
    /// Path to config file (overrides DEALHUB_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "DEALHUB_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "DEALHUB_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(long, env = "DEALHUB_DATABASE")]
    database: Option<PathBuf>,

    /// Redis URL, or "memory" for an in-process cache
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Bearer secret for /api/cron/*
    #[arg(long, env = "CRON_SECRET", hide_env_values = true)]
    cron_secret: Option<String>,

    /// Minutes between scheduled price jobs (0 disables the scheduler)
    #[arg(long, env = "DEALHUB_CRON_INTERVAL_MINUTES")]
    cron_interval_minutes: Option<u64>,

    /// Bearer secret for /api/admin/*
    #[arg(long, env = "DEALHUB_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "DEALHUB_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database_path: self.database.clone(),
            redis_url: self.redis_url.clone(),
            cron_secret: self.cron_secret.clone(),
            cron_interval_minutes: self.cron_interval_minutes,
            admin_secret: self.admin_secret.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = DealhubConfig::load(args.config.as_deref(), args.overrides())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("dealhub_api={0},dealhub_common={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting DealHub API (dealhub-api) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    info!("Database path: {}", config.database.path.display());
    let pool = init_database(&config.database.path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let cache: Arc<dyn Cache> = if config.uses_memory_cache() {
        warn!("Using in-process cache; rate limits are per instance");
        Arc::new(MemoryCache::new())
    } else {
        let redis = RedisCache::connect(&config.redis.url)
            .await
            .with_context(|| format!("Failed to connect to Redis at {}", config.redis.url))?;
        info!("✓ Connected to Redis");
        Arc::new(redis)
    };

    if config.cron.secret.is_none() {
        warn!("CRON_SECRET not set; /api/cron endpoints will reject all calls");
    }

    let state = AppState::new(
        pool,
        cache,
        Arc::new(EstimatedPriceSource),
        ApiSettings {
            cron_secret: config.cron.secret.clone(),
            admin_secret: config.admin.secret.clone(),
            refresh_concurrency: config.cron.refresh_concurrency,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = (config.cron.interval_minutes > 0).then(|| {
        scheduler::spawn_price_job(
            state.clone(),
            Duration::from_secs(config.cron.interval_minutes * 60),
            shutdown_rx,
        )
    });

    let app = build_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("dealhub-api listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            warn!("Scheduler task ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
