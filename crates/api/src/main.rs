use std::time::Duration;

use anyhow::{Context, Result};
use catalog_guard_api::app::{create_app_with_state, AppState};
use catalog_guard_api::config::Config;
use catalog_guard_api::jobs::{JobScheduler, PoolMetricsJob, ScheduledAuditJob};
use catalog_guard_api::middleware::{init_metrics, logging::init_logging};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.logging);

    info!("Starting Catalog Guard API v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = init_metrics() {
        warn!(error = %e, "Prometheus recorder not installed, /metrics will be unavailable");
    }

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config)
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;
    info!("Migrations completed");

    let addr = config.socket_addr().context("Invalid server address")?;
    let scheduler_config = config.scheduler.clone();
    let state = AppState::postgres(config, pool.clone())?;

    let mut jobs = JobScheduler::new();
    jobs.register(PoolMetricsJob::new(pool, db_config.max_connections));
    if scheduler_config.enabled {
        jobs.register(ScheduledAuditJob::new(
            state.scheduler.clone(),
            scheduler_config.poll_interval_minutes,
        ));
    } else {
        info!("In-process scheduled audits disabled; rely on the cron endpoint");
    }
    jobs.start();

    let app = create_app_with_state(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    jobs.shutdown();
    jobs.wait_for_shutdown(Duration::from_secs(30)).await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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
