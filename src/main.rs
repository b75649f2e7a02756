use anyhow::{Context, Result};
use std::sync::Arc;
use stt_gateway::engine::NatsEngine;
use stt_gateway::session::SessionOrchestrator;
use stt_gateway::ws::{create_router, AppState};
use stt_gateway::Config;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/stt-gateway")?;

    info!("{} starting", cfg.service.name);
    info!("Recognition engine: NATS at {}", cfg.engine.nats_url);

    let engine = Arc::new(NatsEngine::connect(&cfg.engine.nats_url).await?);
    let orchestrator = Arc::new(SessionOrchestrator::new(engine, cfg.orchestrator()));

    let router = create_router(AppState::new(orchestrator));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
