use anyhow::Context;
use serde_json::json;

use crate::cli::{utils, OutputFormat};
use crate::config::AppConfig;
use crate::database::DatabaseManager;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to the database")?;

    if let Err(e) = DatabaseManager::migrate(&pool).await {
        utils::output_error(&output_format, &format!("Migration failed: {}", e), Some("MIGRATION_FAILED"))?;
        return Err(e.into());
    }

    utils::output_success(
        &output_format,
        "Migrations applied",
        Some(json!({ "database": crate::config::redact_url(&config.database.url) })),
    )
}
