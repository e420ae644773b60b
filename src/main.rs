// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trailshare local API
//!
//! Serves accounts, profiles and the live location-sharing session to the
//! app's presentation layer.

use std::sync::Arc;
use trailshare::{
    config::Config,
    db::FirestoreDb,
    platform::IdentityProvider,
    services::{FirebaseAuthClient, FirebaseStorageClient, ReportedPosition},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Trailshare API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let identity: Arc<dyn IdentityProvider> =
        Arc::new(FirebaseAuthClient::new(config.firebase_api_key.clone()));
    let blobs = Arc::new(FirebaseStorageClient::new(
        config.storage_bucket.clone(),
        identity.clone(),
    ));
    tracing::info!(bucket = %config.storage_bucket, "Firebase clients initialized");

    let state = Arc::new(AppState::new(
        config.clone(),
        identity,
        Arc::new(db),
        blobs,
        Arc::new(ReportedPosition::new()),
    ));

    // Build router
    let app = trailshare::routes::create_router(state.clone());

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Publish the disconnect of a session still open at exit.
    trailshare::routes::session::close_session(&state).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
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
                .add_directive("trailshare=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
