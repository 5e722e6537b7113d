use anyhow::Result;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::llm_agent::LlmAgent;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::from_env()?;

    // LLM availability is decided once here and never changes afterwards
    let llm = LlmAgent::from_config(&config.llm);

    // Build our application state
    let addr = config.bind_addr();
    let state = std::sync::Arc::new(AppState::new(config, llm));

    let app = routes::build_router(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

// Application state
#[derive(Clone)]
pub struct AppState {
    config: config::Config,
    llm: LlmAgent,
}

impl AppState {
    fn new(config: config::Config, llm: LlmAgent) -> Self {
        Self { config, llm }
    }
}
