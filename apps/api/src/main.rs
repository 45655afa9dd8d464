mod application;
mod config;
mod discovery;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod profile;
mod routes;
mod state;
mod workflow;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::StructuredClient;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::workflow::sync::LocalPlatformSync;
use crate::workflow::WorkflowController;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting JobPilot API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.anthropic_api_url.clone(),
        config.llm_timeout,
    )?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s, max retries: {})",
        llm_client::MODEL,
        config.llm_timeout.as_secs(),
        config.retry.max_retries
    );

    let client = StructuredClient::new(Arc::new(llm), config.retry.clone(), config.llm_timeout);

    info!(
        "Job discovery on {} in {} (salaries in {})",
        config.discovery.platforms.join(", "),
        config.discovery.default_location,
        config.discovery.salary_currency
    );
    let workflow = WorkflowController::new(
        client,
        config.discovery.clone(),
        Arc::new(LocalPlatformSync),
    );

    let state = AppState {
        workflow: Arc::new(workflow),
        max_upload_bytes: config.max_upload_bytes,
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: restrict origins once the web client has a fixed host
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
