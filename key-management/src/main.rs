//! Key management HTTP server.

use anyhow::Context;
use key_management::{
    auth::ensure_admin,
    config::Config,
    server::{AppState, build_router},
    store::{MemoryStore, PostgresStore, Storage},
    uploads::LocalFileStorage,
};
use kms_auth::{TokenConfig, TokenService};
use kms_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting key management server");

    let config = Config::from_env().context("loading configuration")?;
    info!(
        address = %config.server.bind_address(),
        database = config.database.url.is_some(),
        upload_dir = %config.uploads.dir,
        "Configuration loaded"
    );

    match config.database.url.clone() {
        Some(url) => {
            info!("Connecting to PostgreSQL...");
            let store = PostgresStore::connect(
                &url,
                config.database.max_connections,
                config.database.connect_timeout,
            )
            .await
            .context("connecting to PostgreSQL")?;
            store.migrate().await.context("running migrations")?;
            info!("PostgreSQL connected and migrated");
            serve(config, Arc::new(store)).await
        },
        None => {
            warn!("DATABASE_URL not set, using the in-memory store (data is lost on exit)");
            serve(config, Arc::new(MemoryStore::new())).await
        },
    }
}

async fn serve<S>(config: Config, storage: Arc<S>) -> anyhow::Result<()>
where
    S: Storage + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ttl = i64::try_from(config.auth.token_ttl).context("AUTH_TOKEN_TTL out of range")?;
    let tokens = TokenService::new(
        TokenConfig::new(config.auth.jwt_secret.clone()).with_ttl(chrono::Duration::seconds(ttl)),
    );
    let files = LocalFileStorage::new(&config.uploads.dir)
        .await
        .with_context(|| format!("preparing upload directory {}", config.uploads.dir))?;

    let state = AppState::new(storage, tokens, Arc::new(files), Arc::clone(&clock))
        .with_booking_timeout(config.server.request_timeout())
        .with_max_image_bytes(config.uploads.max_bytes);

    if let Some(admin) = &config.auth.bootstrap_admin {
        ensure_admin(state.storage.as_ref(), state.hasher, admin, clock.now()).await?;
    }

    let booking = Arc::clone(&state.booking);
    let app = build_router(state, &config.server.cors_origins);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("HTTP server stopped, draining booking commands");
    if let Err(err) = booking.shutdown(config.server.shutdown_timeout()).await {
        warn!(error = %err, "Booking store did not drain in time");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
