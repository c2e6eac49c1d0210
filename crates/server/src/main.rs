//! itrack REST API Server
//!
//! Serves the issue service under `/api` for the web UI and the
//! assignment client.

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use itrack::config::{DatabaseLocation, TrackerConfig};
use itrack::IssueService;
use itrack_server::create_routes;

/// itrack API server
#[derive(Parser)]
#[command(name = "itrack-server", version)]
#[command(about = "REST API for the itrack issue tracker", long_about = None)]
struct Args {
    /// Config file (default: ./itrack.toml if present)
    #[arg(long, env = "ITRACK_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, or ":memory:" (overrides config)
    #[arg(long, env = "ITRACK_DATABASE")]
    database: Option<String>,

    /// Address to listen on (overrides config)
    #[arg(long, env = "ITRACK_BIND")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let current_dir = std::env::current_dir().context("Failed to read current directory")?;
    let config = TrackerConfig::discover(args.config.as_deref(), &current_dir)?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter().unwrap_or_else(|| "info".into())))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Starting itrack API Server...");

    let location = DatabaseLocation::parse(
        &args
            .database
            .clone()
            .unwrap_or_else(|| config.database_path()),
    );
    let storage = location.open().map_err(|e| {
        anyhow::anyhow!(
            "Failed to open database: {:#}\n\n\
             Check the [database] path in itrack.toml or pass --database.",
            e
        )
    })?;
    match &location {
        DatabaseLocation::InMemory => info!("Using in-memory database"),
        DatabaseLocation::File(path) => info!("Using database at: {}", path.display()),
    }
    let service = Arc::new(IssueService::new(storage));

    // Permissive CORS for local development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api", create_routes(service))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        );

    let addr = args.bind.unwrap_or_else(|| config.bind());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
