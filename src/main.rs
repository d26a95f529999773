// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use waitress_server::{
    api::router,
    auth::TokenCodec,
    config::AppConfig,
    logging,
    state::AppState,
    storage::Database,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log_format);
    tracing::info!(?config, "configuration loaded");

    let db = match Database::open(&config.database_path()) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, path = %config.database_path().display(), "failed to open database");
            return ExitCode::FAILURE;
        }
    };
    match db.ensure_tables() {
        Ok(created) if !created.is_empty() => tracing::info!(?created, "database tables created"),
        Ok(_) => tracing::debug!("database tables already present"),
        Err(e) => {
            tracing::error!(error = %e, "failed to initialize database tables");
            return ExitCode::FAILURE;
        }
    }

    let codec = match TokenCodec::new(&config.jwt_secret) {
        Ok(codec) => codec,
        Err(e) => {
            tracing::error!(error = %e, "invalid token secret");
            return ExitCode::FAILURE;
        }
    };

    let state = AppState::from_config(&config, db, codec);
    let app = router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %config.bind_addr(), "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(addr = %config.bind_addr(), "waitress server listening (docs at /docs)");
    if config.setup_routes_enabled {
        tracing::warn!("setup routes are enabled");
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(watch_signals(shutdown.clone()));

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await;

    match served {
        Ok(()) => {
            tracing::info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM.
async fn watch_signals(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
