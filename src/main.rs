//! vigil: dependency health service.
//!
//! This is the application entry point. It loads configuration from TOML and
//! the environment, initializes tracing, builds the probes and the Axum router,
//! and starts the HTTP server.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vigil::config::{AppConfig, DEFAULT_LOG_FILTER};
use vigil::{create_router, AppError, AppState};

/// vigil: liveness, readiness and dependency health endpoints
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
struct Args {
    /// Path to configuration file (default: config/default.toml if present)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level filter (e.g., "vigil=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

fn init_tracing(filter: &str, json: bool) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Load configuration first so the log format is known
    let config = AppConfig::load(args.config.as_deref());

    // Initialize tracing with priority: CLI > env > default
    let log_filter = args
        .log_level
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    let json = config.as_ref().is_ok_and(|c| c.logging.is_json());
    init_tracing(&log_filter, json);

    let config = config.inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;

    tracing::info!(
        db_host = %config.database.host,
        db_port = config.database.port,
        db_name = %config.database.dbname,
        db_has_password = config.database.has_password(),
        cache_host = %config.cache.host,
        cache_port = config.cache.port,
        probe_timeout_ms = config.probe.timeout_ms,
        concurrent = config.probe.concurrent,
        "Loaded configuration"
    );

    let http_config = config.http.clone();
    let state = AppState::from_config(config);
    let app = create_router(state);

    vigil::http::start_server(app, &http_config).await?;

    Ok(())
}
