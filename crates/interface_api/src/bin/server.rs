//! Civic CRM - API Server Binary
//!
//! Starts the HTTP API and the background maintenance task.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin civic-crm-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin civic-crm-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_SESSION_TTL_SECS` - Session lifetime in seconds
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_SMTP_HOST`, `API_SMTP_PORT`, `API_SMTP_USERNAME`, `API_SMTP_PASSWORD`,
//!   `API_SMTP_SECURITY` - SMTP relay; mail is only logged without a host
//! * `API_MAIL_FROM` - Sender address of newsletters
//! * `API_MAINTENANCE_INTERVAL_SECS` - Seconds between maintenance runs (default: 60)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_mail::{LoggingTransport, MailTransport, SmtpTransport};
use infra_db::{create_pool, run_migrations, DatabaseConfig};
use interface_api::{config::ApiConfig, create_router, delivery, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting Civic CRM API Server"
    );

    let pool = create_pool(
        DatabaseConfig::new(config.database_url.clone()).max_connections(config.db_max_connections),
    )
    .await
    .context("failed to connect to the database")?;

    run_migrations(&pool).await.context("failed to run migrations")?;

    let mailer = mail_transport(&config)?;
    tracing::info!(transport = mailer.name(), "Mail transport ready");

    let state = AppState::new(pool, config.clone(), mailer);
    let maintenance = spawn_maintenance(state.clone(), config.maintenance_interval_secs);
    let app = create_router(state);

    let addr: SocketAddr = config.server_addr().parse().context("invalid server address")?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    maintenance.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// SMTP when a relay is configured, logging otherwise
fn mail_transport(config: &ApiConfig) -> anyhow::Result<Arc<dyn MailTransport>> {
    match config.smtp() {
        Some(smtp) => {
            let transport = SmtpTransport::new(&smtp).context("invalid SMTP configuration")?;
            Ok(Arc::new(transport))
        }
        None => {
            tracing::warn!("No SMTP host configured; outgoing mail is only logged");
            Ok(Arc::new(LoggingTransport))
        }
    }
}

/// Periodically purges expired sessions and sends due newsletters
fn spawn_maintenance(state: AppState, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match delivery::run_maintenance(&state, Utc::now()).await {
                Ok(report) => tracing::debug!(
                    purged_sessions = report.purged_sessions,
                    newsletters_sent = report.newsletters_sent,
                    newsletters_failed = report.newsletters_failed,
                    "Maintenance run complete"
                ),
                Err(e) => tracing::error!(error = %e, "Maintenance run failed"),
            }
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
