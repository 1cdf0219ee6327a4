//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, external clients, the
//! enrollment sweeper and the Axum server lifecycle.

use crate::config::Config;
use crate::domain::enrollment_sweeper::run_enrollment_sweeper;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::identity::SupabaseIdentity;
use crate::infrastructure::payments::TossPayments;
use crate::infrastructure::persistence::PgEnrollmentRepository;
use crate::infrastructure::storage::SupabaseStorage;
use crate::routes::app_router;
use crate::state::{AppState, Integrations, Settings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache (or NullCache fallback)
/// - HTTP clients for the identity provider, object storage and payment gateway
/// - Background enrollment sweeper
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    let cache = connect_cache(&config).await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .user_agent(concat!("coach-programs/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let integrations = Integrations {
        identity: Arc::new(SupabaseIdentity::new(
            http.clone(),
            &config.auth_url,
            config.auth_anon_key.clone(),
        )),
        storage: Arc::new(SupabaseStorage::new(
            http.clone(),
            &config.storage_url,
            config.storage_bucket.clone(),
            config.storage_service_key.clone(),
        )),
        gateway: Arc::new(TossPayments::new(
            http,
            &config.payment_api_url,
            &config.payment_secret_key,
        )),
    };

    let pool = Arc::new(pool);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(run_enrollment_sweeper(
        Arc::new(PgEnrollmentRepository::new(pool.clone())),
        Duration::from_secs(config.enrollment_sweep_interval_seconds),
        shutdown_rx,
    ));
    tracing::info!(
        interval_seconds = config.enrollment_sweep_interval_seconds,
        "Enrollment sweeper started"
    );

    let state = AppState::new(pool, cache, integrations, Settings::from(&config));

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped, waiting for background tasks");
    let _ = shutdown_tx.send(true);
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Enrollment sweeper ended abnormally");
    }

    Ok(())
}

async fn connect_database(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
