use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::{endpoint, parse_base, send_json, ServiceError};
use crate::config::MailConfig;

const SERVICE: &str = "mail provider";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Transactional email delivery. Returns the provider's message id.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<String, ServiceError>;
}

pub struct HttpMailer {
    client: Client,
    base: Option<Url>,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(client: Client, config: &MailConfig) -> Self {
        Self {
            client,
            base: parse_base(SERVICE, &config.api_url),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }
}

#[derive(Serialize)]
struct Outgoing<'a> {
    from: &'a str,
    #[serde(flatten)]
    email: &'a Email,
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<String, ServiceError> {
        let base = match &self.base {
            Some(base) if !self.api_key.is_empty() => base,
            _ => return Err(ServiceError::NotConfigured(SERVICE)),
        };
        let url = endpoint(base, SERVICE, &["emails"])?;

        let request = self.client.post(url).bearer_auth(&self.api_key).json(&Outgoing {
            from: &self.from,
            email,
        });
        let response = send_json(SERVICE, request).await?;

        response
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Decode {
                service: SERVICE,
                message: "missing message id".to_string(),
            })
    }
}
