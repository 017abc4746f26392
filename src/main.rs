//! VacQ - Vaccination appointment booking server
//! Mission: Serve the hospital directory and keep one booking per user

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vacq_backend::{
    config::DEV_JWT_SECRET, create_router, middleware::RateLimitLayer, AppConfig, AppState,
};

#[tokio::main]
async fn main() {
    load_env();
    init_tracing();

    if let Err(e) = run().await {
        error!("Fatal: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::parse();

    if config.jwt_secret == DEV_JWT_SECRET {
        if config.is_production() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        warn!("JWT_SECRET not set, using the development secret");
    }

    let state = AppState::from_config(config.clone())
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    info!("Database ready at: {}", config.database_path);

    if let Some((email, password)) = config.bootstrap_admin() {
        state
            .users
            .ensure_admin(email, password)
            .await
            .context("Failed to bootstrap admin account")?;
        info!("Admin account ensured: {}", email);
    }

    let limiter = RateLimitLayer::new(config.rate_limit());
    let _cleanup = limiter.spawn_cleanup();

    let app = create_router(state, limiter);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Server running in {} mode on port {}",
        config.node_env, config.port
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Initialize tracing, `RUST_LOG` overrides the default filter
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vacq_backend=debug,vacq=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // dotenv never overrides a set variable, so earlier files win
    let _ = dotenv::from_path(Path::new("config/config.env"));
    let _ = dotenv();

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for p in [manifest_dir.join("config/config.env"), manifest_dir.join(".env")] {
        if p.exists() {
            let _ = dotenv::from_path(&p);
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
