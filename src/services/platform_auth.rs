use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

use super::{endpoint, parse_base, send_json, ServiceError};
use crate::config::AuthConfig;

const SERVICE: &str = "auth platform";

/// MFA primitives of the managed platform's auth service. Every call acts
/// as the end user by forwarding their own access token.
#[async_trait]
pub trait PlatformAuth: Send + Sync {
    async fn list_factors(&self, access_token: &str) -> Result<Value, ServiceError>;

    async fn enroll_totp(&self, access_token: &str, friendly_name: Option<&str>) -> Result<Value, ServiceError>;

    async fn challenge(&self, access_token: &str, factor_id: &str) -> Result<Value, ServiceError>;

    async fn verify(
        &self,
        access_token: &str,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> Result<Value, ServiceError>;

    async fn unenroll(&self, access_token: &str, factor_id: &str) -> Result<Value, ServiceError>;
}

pub struct HttpPlatformAuth {
    client: Client,
    base: Option<Url>,
    anon_key: String,
    issuer: String,
}

impl HttpPlatformAuth {
    pub fn new(client: Client, config: &AuthConfig) -> Self {
        Self {
            client,
            base: parse_base(SERVICE, &config.platform_url),
            anon_key: config.anon_key.clone(),
            issuer: config.mfa_issuer.clone(),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let base = self.base.as_ref().ok_or(ServiceError::NotConfigured(SERVICE))?;
        let mut full = vec!["auth", "v1"];
        full.extend_from_slice(segments);
        endpoint(base, SERVICE, &full)
    }

    fn request(&self, method: reqwest::Method, url: Url, access_token: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }
}

#[async_trait]
impl PlatformAuth for HttpPlatformAuth {
    async fn list_factors(&self, access_token: &str) -> Result<Value, ServiceError> {
        let url = self.url(&["user"])?;
        let user = send_json(SERVICE, self.request(reqwest::Method::GET, url, access_token)).await?;
        Ok(user.get("factors").cloned().unwrap_or_else(|| json!([])))
    }

    async fn enroll_totp(&self, access_token: &str, friendly_name: Option<&str>) -> Result<Value, ServiceError> {
        let url = self.url(&["factors"])?;
        let mut body = json!({ "factor_type": "totp", "issuer": self.issuer });
        if let Some(name) = friendly_name {
            body["friendly_name"] = json!(name);
        }
        send_json(SERVICE, self.request(reqwest::Method::POST, url, access_token).json(&body)).await
    }

    async fn challenge(&self, access_token: &str, factor_id: &str) -> Result<Value, ServiceError> {
        let url = self.url(&["factors", factor_id, "challenge"])?;
        send_json(SERVICE, self.request(reqwest::Method::POST, url, access_token).json(&json!({}))).await
    }

    async fn verify(
        &self,
        access_token: &str,
        factor_id: &str,
        challenge_id: &str,
        code: &str,
    ) -> Result<Value, ServiceError> {
        let url = self.url(&["factors", factor_id, "verify"])?;
        let body = json!({ "challenge_id": challenge_id, "code": code });
        send_json(SERVICE, self.request(reqwest::Method::POST, url, access_token).json(&body)).await
    }

    async fn unenroll(&self, access_token: &str, factor_id: &str) -> Result<Value, ServiceError> {
        let url = self.url(&["factors", factor_id])?;
        send_json(SERVICE, self.request(reqwest::Method::DELETE, url, access_token)).await
    }
}
