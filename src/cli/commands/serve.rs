use anyhow::Context;

use crate::app::app;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::state::AppState;

pub async fn handle(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting StudyHub API in {:?} mode", config.environment);
    if config.auth.jwt_secret.is_empty() {
        tracing::warn!("PLATFORM_JWT_SECRET is not set; every protected request will be rejected");
    }

    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await.context("failed to apply migrations")?;
    }

    let state = AppState::from_config(&config, pool).context("failed to build HTTP clients")?;
    let router = app(state, &config.security);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("StudyHub API listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
