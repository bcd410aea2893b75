mod access;
mod config;
mod email;
mod error;
mod handlers;
mod identity;
mod metrics;
mod server;
mod token;
mod verification;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use clap::{Parser, Subcommand};
use richter_payments::{create_processor, PaymentProcessor};
use richter_storage::{Role, Store, StoreError};
use richter_store_sqlite::SqliteStore;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use email::Mailer;
use identity::{IdentityProvider, IdentityToolkitProvider};
use server::AppState;
use token::TokenService;
use verification::VerificationService;

const DEFAULT_DATABASE_URL: &str = "sqlite://richter.db?mode=rwc";
const POOL_SIZE: u32 = 5;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "richter-server")]
#[command(about = "Richter restaurant server: HTTP API and administration")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db?mode=rwc)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        /// Server address
        #[arg(long, default_value = "0.0.0.0:5000")]
        addr: String,
    },
    /// Grant the admin role to an existing account
    Promote {
        /// Email of the account to promote
        #[arg(long)]
        email: String,
    },
}

// ────────────────────────────────────── Health ──────────────────────────────────────

#[derive(Clone)]
struct ReadinessCheck {
    ready: tokio::sync::watch::Receiver<bool>,
    store: Arc<dyn Store>,
}

impl ReadinessCheck {
    fn new(ready: tokio::sync::watch::Receiver<bool>, store: Arc<dyn Store>) -> Self {
        Self { ready, store }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn readiness_handler(
    State(check): State<ReadinessCheck>,
) -> Result<&'static str, StatusCode> {
    // Not ready once shutdown started, or while the store is unreachable
    if !*check.ready.borrow() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    match check.store.ping().await {
        Ok(()) => Ok("ok"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

fn health_router(check: ReadinessCheck) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(readiness_handler))
        .with_state(check)
}

async fn shutdown_signal(readiness_tx: tokio::sync::watch::Sender<bool>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, shutting down gracefully...");
        }
    }

    // Mark not ready on shutdown for clean traffic drain
    let _ = readiness_tx.send(false);
}

// ────────────────────────────────────── Commands ──────────────────────────────────────

async fn open_store(database_url: &str, timeout: Duration) -> Result<Arc<dyn Store>, StoreError> {
    let store = SqliteStore::open_with(database_url, POOL_SIZE, timeout).await?;
    Ok(Arc::new(store))
}

async fn cmd_serve(database_url: &str, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let timeout = config.outbound_timeout;

    let store = open_store(database_url, timeout).await?;
    tracing::info!(database_url, "Store opened");

    let mailer = match &config.email {
        Some(email) => {
            tracing::info!(from = %email.from_address, "Email delivery enabled");
            Some(Arc::new(Mailer::from_config(email, timeout)?))
        }
        None => {
            tracing::warn!("RICHTER_EMAIL_PROVIDER not set, verification emails are disabled");
            None
        }
    };

    let identity: Option<Arc<dyn IdentityProvider>> = match &config.identity {
        Some(identity) => Some(Arc::new(IdentityToolkitProvider::new(identity, timeout)?)),
        None => None,
    };

    let payments: Arc<dyn PaymentProcessor> =
        Arc::from(create_processor(&config.payments, timeout)?);

    let verification = Arc::new(VerificationService::new(
        store.clone(),
        mailer.clone(),
        identity,
        config.public_url.clone(),
        timeout,
    ));

    let state = AppState {
        store: store.clone(),
        tokens: Arc::new(TokenService::new(
            config.token.secret.as_bytes(),
            config.token.ttl,
        )),
        verification,
        payments,
        mailer,
        currency: config.payments.currency.clone(),
        outbound_timeout: timeout,
    };

    let metrics_handle = metrics::init_metrics()?;

    let (readiness_tx, readiness_rx) = tokio::sync::watch::channel(true);
    let app = server::router(state)
        .merge(health_router(ReadinessCheck::new(readiness_rx, store)))
        .merge(metrics::metrics_router(metrics_handle));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "richter-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(readiness_tx))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn cmd_promote(database_url: &str, email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(database_url, Duration::from_secs(10)).await?;
    let email = verification::normalize_email(email)?;

    let account = match store.get_account_by_email(&email).await {
        Ok(account) => account,
        Err(StoreError::NotFound) => {
            return Err(format!("No account registered for {}", email).into());
        }
        Err(e) => return Err(e.into()),
    };

    let outcome = store.set_account_role(&account.id, Role::Admin).await?;
    if outcome.modified == 0 {
        println!("{} is already an admin", email);
    } else {
        println!("Promoted {} to admin", email);
    }
    Ok(())
}

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    match cli.command {
        Command::Serve { addr } => cmd_serve(&database_url, &addr).await?,
        Command::Promote { email } => cmd_promote(&database_url, &email).await?,
    }

    Ok(())
}
