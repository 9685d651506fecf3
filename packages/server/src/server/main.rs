// Main entry point for API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use juridico_core::domains::audit::{AuditWorker, Judge};
use juridico_core::domains::cache::PgVectorCacheStore;
use juridico_core::domains::workflow::{Orchestrator, WorkflowSettings};
use juridico_core::kernel::ServerDeps;
use juridico_core::server::{build_app, AxumAppState};
use juridico_core::Config;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,juridico_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Juridico API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(audit_mode = %config.audit_mode, "Configuration loaded");

    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("Failed to connect to database")?;

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            // The table only exists once the cache has been initialized
            match PgVectorCacheStore::new(pool.clone()).purge_expired().await {
                Ok(purged) => tracing::info!(purged, "Purged expired semantic cache entries"),
                Err(e) => tracing::debug!(error = %e, "Semantic cache purge skipped"),
            }
            Some(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory stores");
            None
        }
    };

    let deps = ServerDeps::from_config(&config, pool)?;
    let settings = WorkflowSettings::from(&config);

    // Detached audits run on their own task until shutdown
    let shutdown = CancellationToken::new();
    let judge = Arc::new(Judge::new(
        deps.ai.clone(),
        settings.audit_model.clone(),
        settings.model_timeout,
    ));
    let (dispatcher, audit_handle) =
        AuditWorker::spawn(judge.clone(), deps.audit_sink.clone(), shutdown.clone());

    let orchestrator = Orchestrator::initialize(&deps, settings, judge, dispatcher).await;

    // Room for every model call a blocking-audit turn can make
    let request_timeout = config.model_timeout() * (2 * config.max_revisions + 4);
    let app = build_app(
        AxumAppState::new(orchestrator, deps),
        &config.allowed_origins,
        request_timeout,
    );

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped, cancelling pending audits");
    shutdown.cancel();
    if tokio::time::timeout(Duration::from_secs(5), audit_handle)
        .await
        .is_err()
    {
        tracing::warn!("Audit worker did not stop in time");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
