//! Slidepilot - conversational slide deck agent
//!
//! A Rust backend running a tool-calling loop that lets an LLM edit a
//! presentation while a browser renderer follows along over SSE.

mod api;
mod config;
mod deck;
mod llm;
mod runtime;
mod state_machine;
mod system_prompt;
mod tools;

use api::{create_router, AppState};
use config::Config;
use deck::Presentation;
use llm::{CredentialStore, LoggingService, OpenAIService};
use runtime::{RuntimeOptions, SessionHandle};
use state_machine::SessionContext;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidepilot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = Config::from_env();

    let credentials = CredentialStore::new(config.api_key.clone());
    if !credentials.is_set() {
        tracing::warn!("No API key configured. Set OPENAI_API_KEY or POST /api/credential.");
    }

    let client = OpenAIService::new(
        credentials.clone(),
        config.model.clone(),
        config.gateway.as_deref(),
        config.request_timeout,
    )?;
    let llm = LoggingService::new(Arc::new(client));

    tracing::info!(
        model = %config.model,
        convention = %config.convention,
        max_iterations = config.max_iterations,
        "LLM client initialized"
    );

    let context = SessionContext::new(uuid::Uuid::new_v4().to_string(), config.model.clone())
        .with_max_iterations(config.max_iterations)
        .with_convention(config.convention);
    let options = RuntimeOptions {
        max_output_tokens: Some(config.max_output_tokens),
        request_timeout: config.request_timeout,
    };
    let presentation = Arc::new(RwLock::new(Presentation::default()));

    let session = SessionHandle::spawn(llm, context, options, credentials, presentation);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(AppState::new(session))
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Slidepilot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
