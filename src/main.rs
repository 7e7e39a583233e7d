// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FileVault API Server
//!
//! Serves sign-in, sign-up and the file dashboard, backed by Appwrite.

use anyhow::Context;
use filevault::{
    backend::{AppwriteClient, MemoryBackend},
    config::{BackendKind, Config},
    services::SessionGateway,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, backend = ?config.backend, "Starting FileVault API");

    let settings = (&config).into();
    let gateway = match config.backend {
        BackendKind::Appwrite => {
            let client =
                AppwriteClient::from_config(&config).context("Failed to build Appwrite client")?;
            tracing::info!(endpoint = %config.appwrite_endpoint, "Appwrite client initialized");
            SessionGateway::with_backend(Arc::new(client), settings)
        }
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backend, data is lost on restart");
            SessionGateway::with_backend(Arc::new(MemoryBackend::new()), settings)
        }
    };

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        gateway,
    });

    // Build router
    let app = filevault::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("filevault=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .try_init()?;
    Ok(())
}
