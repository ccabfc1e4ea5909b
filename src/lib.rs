pub mod api; // HTTP transport
pub mod cli; // Terminal chat mode
pub mod config;
pub mod db;
pub mod intake; // Dialogue engine, phases, merge/validate
pub mod models;
pub mod oracle; // Language understanding
pub mod registry;
pub mod service;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::config::IntakeConfig;
use crate::db::{DatabaseError, SqliteRecordStore};
use crate::oracle::{LlmOracle, OllamaClient, OracleError};
use crate::service::InterviewService;

/// How the binary talks to participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Http,
    Terminal,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to prepare data directory: {0}")]
    DataDir(std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Oracle setup failed: {0}")]
    Oracle(#[from] OracleError),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(std::io::Error),
    #[error(transparent)]
    Cli(#[from] cli::CliError),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Build the service from configuration and serve participants until
/// shutdown (HTTP) or end of input (terminal).
pub async fn run(mode: RunMode) -> Result<(), AppError> {
    let config = IntakeConfig::from_env();
    tracing::info!(
        version = config::APP_VERSION,
        ?mode,
        model = %config.model,
        db = %config.db_path.display(),
        "CareIntake starting"
    );

    let service = Arc::new(build_service(config)?);
    let sweeper = spawn_idle_sweeper(Arc::clone(&service));

    let result = match mode {
        RunMode::Http => serve_http(Arc::clone(&service)).await,
        RunMode::Terminal => {
            let stdin = BufReader::new(tokio::io::stdin());
            cli::run_chat(&service, stdin, tokio::io::stdout())
                .await
                .map_err(AppError::from)
        }
    };

    sweeper.abort();
    tracing::info!("CareIntake stopped");
    result
}

fn build_service(config: IntakeConfig) -> Result<InterviewService, AppError> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(AppError::DataDir)?;
        }
    }
    let store = SqliteRecordStore::open(&config.db_path)?;

    let client = OllamaClient::new(&config.ollama_url, config.oracle_timeout.as_secs())?;
    let oracle = LlmOracle::new(client, &config.model);

    Ok(InterviewService::new(Arc::new(oracle), Arc::new(store), config))
}

/// Periodically drop idle engines. Sweeps at a tenth of the idle timeout,
/// at least once a second.
fn spawn_idle_sweeper(service: Arc<InterviewService>) -> tokio::task::JoinHandle<()> {
    let period = (service.config().session_idle_timeout / 10).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = service.evict_idle() {
                tracing::error!(error = %e, "Idle session sweep failed");
            }
        }
    })
}

async fn serve_http(service: Arc<InterviewService>) -> Result<(), AppError> {
    let addr = service.config().listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| AppError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(addr = %addr, "HTTP API listening");

    let app = api::intake_api_router(service);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
        })
        .await
        .map_err(AppError::Serve)
}
