// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use churninsight_gateway::{
    api::router,
    auth::TokenService,
    bootstrap,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::UserDatabase,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_tracing(config.log_format);

    let database_path = config.database_path();
    let users = UserDatabase::open(&database_path).map_err(|e| {
        tracing::error!(
            path = %database_path.display(),
            error = %e,
            "Failed to open credential store"
        );
        e
    })?;
    tracing::info!(path = %database_path.display(), "Credential store opened");

    // Traffic is only accepted once the identity baseline is in place.
    let outcome = bootstrap::run(&users).map_err(|e| {
        tracing::error!(error = %e, "Bootstrap reconciliation failed, refusing to start");
        e
    })?;
    tracing::info!(outcome = ?outcome, "Bootstrap reconciliation complete");

    let tokens = TokenService::new(config.jwt_secret.as_bytes());
    let state = AppState::new(users, tokens);
    let app = router(state, &config.allowed_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "ChurnInsight gateway listening (docs at /swagger-ui)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
