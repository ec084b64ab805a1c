use crate::cli::{utils, OutputFormat};
use crate::config::AppConfig;

/// Print the effective configuration with secrets masked
pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    utils::output_document(&output_format, &config.redacted())
}
