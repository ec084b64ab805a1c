use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::services::{
    http_client, CalendarProvider, CompletionProvider, HttpCalendarProvider, HttpCompletionProvider, HttpMailer,
    HttpPlatformAuth, HttpPushGateway, Mailer, PlatformAuth, PushGateway,
};

/// Shared per-process dependencies handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub verifier: TokenVerifier,
    pub platform_auth: Arc<dyn PlatformAuth>,
    pub mailer: Arc<dyn Mailer>,
    pub push: Arc<dyn PushGateway>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub ai: Arc<dyn CompletionProvider>,
    pub limits: Limits,
}

/// Request-shape limits that come from configuration
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_prompt_chars: usize,
    pub max_request_size_bytes: usize,
}

impl AppState {
    /// Wire the production HTTP clients from configuration
    pub fn from_config(config: &AppConfig, pool: PgPool) -> Result<Self, reqwest::Error> {
        let client = http_client()?;

        Ok(Self {
            pool,
            verifier: TokenVerifier::new(&config.auth.jwt_secret, &config.auth.jwt_audience),
            platform_auth: Arc::new(HttpPlatformAuth::new(client.clone(), &config.auth)),
            mailer: Arc::new(HttpMailer::new(client.clone(), &config.mail)),
            push: Arc::new(HttpPushGateway::new(client.clone(), &config.push)),
            calendar: Arc::new(HttpCalendarProvider::new(client.clone(), &config.calendar)),
            ai: Arc::new(HttpCompletionProvider::new(client, &config.ai)),
            limits: Limits {
                max_prompt_chars: config.ai.max_prompt_chars,
                max_request_size_bytes: config.security.max_request_size_bytes,
            },
        })
    }
}
