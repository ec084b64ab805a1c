//! Clients for the external collaborators the API delegates to.
//!
//! Each collaborator is a trait so handlers can run against fakes; the
//! `Http*` types are the production implementations over `reqwest`.

pub mod ai;
pub mod calendar;
pub mod mailer;
pub mod platform_auth;
pub mod push;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

pub use ai::{Completion, CompletionProvider, CompletionRequest, HttpCompletionProvider};
pub use calendar::{CalendarProvider, ExternalEvent, HttpCalendarProvider};
pub use mailer::{Email, HttpMailer, Mailer};
pub use platform_auth::{HttpPlatformAuth, PlatformAuth};
pub use push::{DeliveryOutcome, HttpPushGateway, PushGateway, PushMessage};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{service} responded {status}: {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned an unexpected payload: {message}")]
    Decode { service: &'static str, message: String },
}

/// Shared outbound HTTP client
pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(20))
        .build()
}

/// Parse a configured base URL; empty means the service is disabled.
pub(crate) fn parse_base(service: &'static str, raw: &str) -> Option<Url> {
    if raw.trim().is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Ignoring invalid {} URL '{}': {}", service, raw, e);
            None
        }
    }
}

/// Append path segments to a base URL, percent-encoding each segment.
pub(crate) fn endpoint(base: &Url, service: &'static str, segments: &[&str]) -> Result<Url, ServiceError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ServiceError::NotConfigured(service))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Send a request and return its JSON body, turning non-2xx into `Upstream`.
pub(crate) async fn send_json(service: &'static str, request: RequestBuilder) -> Result<Value, ServiceError> {
    let response = request
        .send()
        .await
        .map_err(|source| ServiceError::Http { service, source })?;

    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ServiceError::Http { service, source })?;

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    if status.is_success() {
        Ok(body)
    } else {
        Err(ServiceError::Upstream {
            service,
            status: status.as_u16(),
            message: upstream_message(&body, status),
        })
    }
}

fn upstream_message(body: &Value, status: StatusCode) -> String {
    if let Some(message) = body.pointer("/error/message").and_then(Value::as_str) {
        return message.to_string();
    }
    for key in ["msg", "message", "error_description", "error"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return message.to_string();
        }
    }
    match body {
        Value::String(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => status.canonical_reason().unwrap_or("request failed").to_string(),
    }
}
