// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Atkans Med API Server
//!
//! Serves patient records, doctor access grants and OTP sign-in over a
//! JSON REST API.

use atkans_med::{
    config::{Config, DatabaseBackend},
    db::{Database, FirestoreStore},
    error::set_expose_internal_details,
    services::Notifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        env = %config.app_env,
        "Starting Atkans Med API"
    );

    set_expose_internal_details(!config.is_production());

    let db = match config.database_backend {
        DatabaseBackend::Memory => {
            tracing::warn!("Using in-memory database; data is lost on restart");
            Database::memory()
        }
        DatabaseBackend::Firestore => match FirestoreStore::connect(&config.gcp_project_id).await {
            Ok(store) => {
                tracing::info!(project = %config.gcp_project_id, "Firestore connected");
                Database::firestore(store)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Firestore unavailable; serving in offline mode"
                );
                Database::offline()
            }
        },
    };

    let notifier = Notifier::from_config(&config);

    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tracing::info!(path = %config.upload_dir, "Upload directory ready");

    // Build shared state
    let port = config.port;
    let state = Arc::new(AppState::new(config, db, notifier)?);

    // Build router
    let app = atkans_med::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atkans_med=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
