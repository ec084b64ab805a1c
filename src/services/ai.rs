use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use super::{endpoint, parse_base, send_json, ServiceError};
use crate::config::AiConfig;

const SERVICE: &str = "AI provider";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError>;
}

/// OpenAI-compatible `chat/completions` endpoint
pub struct HttpCompletionProvider {
    client: Client,
    base: Option<Url>,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl HttpCompletionProvider {
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            base: parse_base(SERVICE, &config.api_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, ServiceError> {
        let base = match &self.base {
            Some(base) if !self.api_key.is_empty() => base,
            _ => return Err(ServiceError::NotConfigured(SERVICE)),
        };
        let url = endpoint(base, SERVICE, &["chat", "completions"])?;

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": 0.4,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
        });

        let response = send_json(SERVICE, self.client.post(url).bearer_auth(&self.api_key).json(&body)).await?;
        parse_completion(&response, &self.model)
    }
}

fn parse_completion(response: &Value, fallback_model: &str) -> Result<Completion, ServiceError> {
    let text = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| ServiceError::Decode {
            service: SERVICE,
            message: "response has no choices".to_string(),
        })?;

    Ok(Completion {
        text: text.trim().to_string(),
        model: response
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(fallback_model)
            .to_string(),
    })
}
