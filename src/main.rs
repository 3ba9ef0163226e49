//! LLM Gateway - Main entry point
//!
//! This binary creates and runs the HTTP server with all configured routes
//! and middleware. Configuration is loaded from a YAML file.

use anyhow::Result;
use chrono::Local;
use llm_gateway_rust::{
    app_router,
    core::{init_metrics, AppConfig},
    services::{CapacityReporter, LlmGateway, ModelRegistry, OpenAiCompatAdapter},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Custom time formatter that uses local timezone (respects TZ environment variable)
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    // Always suppress noisy HTTP library logs regardless of RUST_LOG setting
    let base_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,llm_gateway_rust=debug".to_string());
    let filter_str = format!("{},hyper=warn,h2=warn,reqwest=warn", base_filter);
    let filter = tracing_subscriber::EnvFilter::new(filter_str);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_timer(LocalTime))
        .init();

    // Initialize metrics
    init_metrics();

    // Load configuration
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    let config = AppConfig::load(&config_path)?;
    tracing::info!(
        path = %config_path,
        models = config.models.len(),
        "Configuration loaded"
    );

    // Build the admission engine and the upstream adapter
    let registry = Arc::new(ModelRegistry::from_config(&config)?);
    let adapter = Arc::new(OpenAiCompatAdapter::from_config(&config)?);
    let gateway = Arc::new(LlmGateway::new(Arc::clone(&registry), adapter));
    let reporter = CapacityReporter::new(Arc::clone(&registry));

    for model in registry.models() {
        tracing::info!(
            model = model.name(),
            weight = model.weight(),
            capacity_type = model.strategy().capacity_type().as_str(),
            keys = model.strategy().keys().len(),
            per_key_limit = model.strategy().per_key_limit(),
            "Registered model"
        );
    }

    let state = AppState { gateway, reporter };
    let app = app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
