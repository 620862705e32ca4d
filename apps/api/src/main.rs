mod config;
mod errors;
mod interview;
mod llm_client;
mod models;
mod routes;
mod state;
mod storage;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::interview::driver::InterviewDriver;
use crate::interview::export::TranscriptExporter;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3BlobStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interviewer API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let mut llm = LlmClient::new(config.openai_api_key.clone())
        .context("Failed to build LLM HTTP client")?;
    if let Some(url) = &config.openai_api_url {
        llm = llm.with_api_url(url.clone());
    }
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let exporter = TranscriptExporter::new(
        Arc::new(S3BlobStore::new(s3)),
        config.s3_bucket.clone(),
        config.export_prefix.clone(),
    );
    let driver = InterviewDriver::new(Arc::new(llm), exporter);

    // Build app state
    let state = AppState::new(driver);
    let idle_ttl = Duration::from_secs(config.session_idle_ttl_secs);
    state.sessions.spawn_sweeper(idle_ttl);
    info!("Session sweeper started (idle TTL: {}s)", idle_ttl.as_secs());

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "interviewer-static",
    );

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &config.s3_endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    aws_sdk_s3::Client::new(&loader.load().await)
}
