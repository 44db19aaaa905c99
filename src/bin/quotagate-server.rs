// ABOUTME: Quotagate server binary wiring config, logging, counter backend, and HTTP routes
// ABOUTME: Serves a rate-limited sample API plus a health endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Quotagate

use anyhow::{Context, Result};
use axum::extract::Extension;
use axum::routing::{get, post};
use axum::{Json, Router};
use quotagate::auth::{NoSessionProvider, NoSubscriptionProvider};
use quotagate::config::environment::ServerConfig;
use quotagate::counter::factory::Counter;
use quotagate::counter::CounterProvider;
use quotagate::middleware::rate_limit_middleware;
use quotagate::rate_limiting::RateLimitEngine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct HealthState {
    engine: Arc<RateLimitEngine>,
    counter_configured: bool,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat(Json(request): Json<ChatRequest>) -> Json<Value> {
    // Placeholder for the upstream chat backend; the interesting part of
    // this route is the rate limit layer wrapped around it.
    Json(json!({ "reply": format!("echo: {}", request.message) }))
}

async fn health(Extension(state): Extension<HealthState>) -> Json<Value> {
    let counter_status = if state.counter_configured {
        match state.engine.counter_health().await {
            Ok(()) => "ok",
            Err(_) => "error",
        }
    } else {
        "unconfigured"
    };

    Json(json!({ "status": "ok", "counter": counter_status }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("failed to load configuration")?;
    quotagate::logging::init_from_env()?;

    let counter = Counter::from_server_config(&config)
        .await
        .context("failed to initialize counting backend")?;
    let counter: Option<Arc<dyn CounterProvider>> =
        counter.map(|c| Arc::new(c) as Arc<dyn CounterProvider>);
    let counter_configured = counter.is_some();

    let engine = Arc::new(
        RateLimitEngine::new(
            Arc::new(NoSessionProvider),
            Arc::new(NoSubscriptionProvider),
            counter,
        )
        .with_secure_cookies(config.environment.is_production()),
    );

    let app = Router::new()
        .route("/api/chat", post(chat))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&engine),
            rate_limit_middleware,
        ))
        .route("/health", get(health))
        .layer(Extension(HealthState {
            engine,
            counter_configured,
        }));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(environment = %config.environment, "quotagate server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler; shutting down on task end");
    }
}
