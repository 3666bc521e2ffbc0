//! salon-server - concert program service
//!
//! Serves the concert/performance JSON API and the program page over a
//! single SQLite database.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use salon_common::api::auth::load_admin_secret;
use salon_common::config::{ConfigSource, Overrides, ServerConfig};
use salon_common::db::init_database;
use salon_server::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for salon-server
#[derive(Parser, Debug)]
#[command(name = "salon-server")]
#[command(about = "Salon concert program service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SALON_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "SALON_BIND")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(short, long, env = "SALON_DATABASE")]
    database: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = "SALON_CONFIG")]
    config: Option<PathBuf>,

    /// Value of the admin cookie
    #[arg(long, env = "ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Overrides {
            port: args.port,
            bind: args.bind,
            database_path: args.database,
            admin_secret: args.admin_secret,
            config_file: args.config,
        }
    }
}

/// Log filter for a configured level
///
/// A bare level applies to this service's crates; anything containing `=`
/// is used as a full directive.
fn filter_directive(level: &str) -> String {
    if level.contains('=') {
        level.to_string()
    } else {
        format!(
            "salon_server={level},salon_common={level},tower_http={level}",
            level = level
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ServerConfig::resolve(args.into()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter_directive(&config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting salon-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &config.source {
        ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file {} not found; using defaults", path.display())
        }
        ConfigSource::Defaults => info!("No config directory; using defaults"),
    }

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    let admin_secret = match config.admin_secret.clone() {
        Some(secret) => secret,
        None => {
            let secret = load_admin_secret(&pool)
                .await
                .context("Failed to load admin secret")?;
            warn!("No admin secret configured; using the generated secret stored in the database");
            secret
        }
    };

    let state = AppState::new(pool, &admin_secret, config.secure_cookies);
    let app = build_router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("salon-server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
