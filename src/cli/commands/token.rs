use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{sign_token, Claims};
use crate::cli::{utils, OutputFormat};
use crate::config::{AppConfig, Environment};

pub fn handle(
    config: &AppConfig,
    user_id: Option<Uuid>,
    email: Option<String>,
    hours: i64,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    if config.environment != Environment::Development {
        anyhow::bail!("token minting is only available in development");
    }
    if hours <= 0 {
        anyhow::bail!("--hours must be positive");
    }

    let user_id = user_id.unwrap_or_else(Uuid::new_v4);
    let claims = Claims::new(user_id, email, &config.auth.jwt_audience, Duration::hours(hours));
    let token = sign_token(&claims, &config.auth.jwt_secret)?;

    match output_format {
        OutputFormat::Json => utils::output_success(
            &output_format,
            "Token minted",
            Some(json!({ "user_id": user_id, "expires_at": claims.exp, "token": token })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
