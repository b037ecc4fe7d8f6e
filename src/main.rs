// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Amoro planner API server
//!
//! Serves the calendar, to-do, mood and notification views from one shared
//! activity cache in front of the remote task store.

use amoro_planner::{
    config::Config,
    services::{ActivityService, FileFlagStore, PeriodCache, RefreshFlags, TaskStoreClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Amoro planner API");

    let store = TaskStoreClient::new(&config.task_store_url, config.request_timeout)
        .expect("Failed to build task store client");
    tracing::info!(
        base_url = %store.base_url(),
        timeout_secs = config.request_timeout.as_secs(),
        "Task store client initialized"
    );

    let flags = RefreshFlags::new(Arc::new(FileFlagStore::new(&config.flag_store_path)));
    tracing::info!(path = %config.flag_store_path.display(), "Refresh flags initialized");

    // One cache shared by every view
    let activities = ActivityService::new(store, PeriodCache::new(), flags);

    let state = Arc::new(AppState {
        config: config.clone(),
        activities,
    });

    let app = amoro_planner::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("amoro_planner=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
