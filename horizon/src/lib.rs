use std::{net::SocketAddr, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use trendstore::{
    config::StorageConfig,
    errors::{CycleError, StorageError},
    models::{CycleReport, SourceKind},
    sync::RunnerStatus,
    TrendStorage,
};

/// Runs the command line interface for the horizon collector.
pub async fn run_cli() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Some(Command::Collect(args)) => run_collect(args).await?,
        Some(Command::Serve(args)) => run_serve(args).await?,
        Some(Command::SeedKeywords(args)) => run_seed(args).await?,
        Some(Command::Status(args)) => run_status(args).await?,
        None => {
            println!("No subcommand provided. Use --help to see available commands.");
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Runs one collection cycle per requested source and prints the reports
    Collect(CollectArgs),
    /// Starts the HTTP trigger service
    Serve(ServeArgs),
    /// Upserts the labeled synthetic keyword rows; existing keyword rows are kept
    SeedKeywords(StorageArgs),
    /// Prints row counts, registered fetchers and recent cycles
    Status(StorageArgs),
}

#[derive(Args, Clone)]
struct StorageArgs {
    /// Base directory for the trend store and catalog
    #[arg(long, env = "HORIZON_BASE_PATH")]
    base_path: PathBuf,
    /// Optional JSON rule table replacing the built-in defaults
    #[arg(long, env = "HORIZON_RULES")]
    rules: Option<PathBuf>,
    /// Optional GitHub token for GitFetcher
    #[arg(long, env = "GITHUB_TOKEN")]
    github_token: Option<String>,
}

#[derive(Args)]
struct CollectArgs {
    #[command(flatten)]
    storage: StorageArgs,
    /// repositories, models, keywords or all
    #[arg(default_value = "all")]
    source: String,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    storage: StorageArgs,
    /// Socket address to bind the trigger service
    #[arg(long, env = "HORIZON_BIND", default_value = "127.0.0.1:3000")]
    bind: String,
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<TrendStorage>,
}

impl AppState {
    pub fn new(storage: Arc<TrendStorage>) -> Self {
        Self { storage }
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn from_storage(err: StorageError) -> Self {
        match err {
            StorageError::InvalidArg(msg) => ApiError::BadRequest(msg),
            StorageError::Unavailable(msg) => ApiError::Unavailable(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }

    fn from_cycle(err: CycleError) -> Self {
        match err {
            CycleError::EmptyBatch(_) => ApiError::Unprocessable(err.to_string()),
            CycleError::CycleInProgress(_) => ApiError::Conflict(err.to_string()),
            CycleError::NoFetcher(_) => ApiError::NotFound(err.to_string()),
            CycleError::StoreUnavailable(_) => ApiError::Unavailable(err.to_string()),
            CycleError::Storage(storage) => ApiError::from_storage(storage),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(value: StorageError) -> Self {
        ApiError::from_storage(value)
    }
}

impl From<CycleError> for ApiError {
    fn from(value: CycleError) -> Self {
        ApiError::from_cycle(value)
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct SourceSummary {
    source: SourceKind,
    table: &'static str,
    fetcher: Option<&'static str>,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Opens storage under `args.base_path` and registers the three provider fetchers.
fn open_storage(args: &StorageArgs) -> anyhow::Result<Arc<TrendStorage>> {
    let config = StorageConfig::new(&args.base_path).with_rules(args.rules.clone());
    let storage = TrendStorage::new(config).context("failed to open trend storage")?;

    match gitfetcher::GitFetcher::with_default_client(args.github_token.clone()) {
        Ok(fetcher) => {
            storage.runner.register_fetcher(Arc::new(fetcher));
            info!("GitFetcher registered");
        }
        Err(err) => {
            error!("Failed to initialize GitFetcher: {}", err);
        }
    }
    storage
        .runner
        .register_fetcher(Arc::new(hubfetcher::HubFetcher::with_default_client()));
    storage
        .runner
        .register_fetcher(Arc::new(viewfetcher::PageviewFetcher::with_default_client()));

    Ok(Arc::new(storage))
}

fn parse_sources(raw: &str) -> anyhow::Result<Vec<SourceKind>> {
    if raw.eq_ignore_ascii_case("all") {
        return Ok(SourceKind::ALL.to_vec());
    }
    raw.split(',')
        .map(|part| SourceKind::from_str(part).map_err(anyhow::Error::from))
        .collect()
}

async fn run_collect(args: CollectArgs) -> anyhow::Result<()> {
    let sources = parse_sources(&args.source)?;
    let storage = open_storage(&args.storage)?;

    let mut failures = Vec::new();
    for kind in sources {
        match storage.runner.run_cycle(kind).await {
            Ok(report) => {
                info!(
                    "{}: collected {}, deleted {}, skipped {}",
                    kind, report.collected_count, report.deleted_count, report.skipped_count
                );
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Err(err) => {
                warn!("{}: cycle failed: {}", kind, err);
                failures.push(format!("{kind}: {err}"));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} cycle(s) failed: {}", failures.len(), failures.join("; "))
    }
}

async fn run_seed(args: StorageArgs) -> anyhow::Result<()> {
    let storage = open_storage(&args)?;
    let written = storage
        .runner
        .seed_keywords()
        .await
        .context("failed to seed keywords")?;
    println!(
        "{}",
        json!({ "ok": true, "inserted": written, "label": trendstore::synthetic::SYNTHETIC_LABEL })
    );
    Ok(())
}

async fn run_status(args: StorageArgs) -> anyhow::Result<()> {
    let storage = open_storage(&args)?;
    let status = storage.runner.status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    let addr: SocketAddr = args.bind.parse().context("failed to parse bind address")?;
    let storage = open_storage(&args.storage)?;

    let router = build_router(AppState::new(storage));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind trigger listener")?;

    info!("Trigger service listening on {}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("trigger server error")?;

    Ok(())
}

/// Builds the HTTP router used by the trigger service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/cycles/:source", post(trigger_cycle))
        .route("/api/status", get(get_status))
        .route("/api/sources", get(list_sources))
        .with_state(state)
}

async fn trigger_cycle(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> ApiResult<Json<CycleReport>> {
    let kind = SourceKind::from_str(&source)?;
    info!("Cycle triggered for {}", kind);
    let report = state.storage.runner.run_cycle(kind).await.map_err(|err| {
        warn!("Cycle for {} failed: {}", kind, err);
        ApiError::from_cycle(err)
    })?;
    Ok(Json(report))
}

async fn get_status(State(state): State<AppState>) -> ApiResult<Json<RunnerStatus>> {
    let status = state.storage.runner.status().await?;
    Ok(Json(status))
}

async fn list_sources(State(state): State<AppState>) -> ApiResult<Json<Vec<SourceSummary>>> {
    let fetchers = state.storage.runner.list_fetchers();
    let sources = SourceKind::ALL
        .iter()
        .map(|kind| SourceSummary {
            source: *kind,
            table: kind.table_name(),
            fetcher: fetchers
                .iter()
                .find(|info| info.source == *kind)
                .map(|info| info.name),
        })
        .collect();
    Ok(Json(sources))
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("Shutdown signal received");
}
