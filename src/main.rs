#![allow(dead_code)]

mod config;
mod data;
mod errors;
mod handlers;
mod ml;
mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::data::MockHistoryProvider;
use crate::handlers::AppState;
use crate::ml::engine::ForecastEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "agromind=info,tower_http=info".into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    // Configuration is loaded and validated once; a bad weight set or
    // malformed optimal range aborts here, never at request time.
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded and validated");

    let engine = Arc::new(ForecastEngine::new(config.forecast.clone())?);
    let history = Arc::new(MockHistoryProvider::new());

    let state = AppState {
        engine,
        history,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route(
            "/api/v1/forecast/predict",
            get(handlers::forecasts::predict).post(handlers::forecasts::predict_with_factors),
        )
        .route(
            "/api/v1/forecast/compare",
            get(handlers::forecasts::compare),
        )
        .route(
            "/api/v1/forecast/algorithm/info",
            get(handlers::forecasts::algorithm_info),
        )
        .route(
            "/api/v1/forecast/history/:crop",
            get(handlers::forecasts::history),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting AgroMind server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
