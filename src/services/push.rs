use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use url::Url;

use super::{endpoint, parse_base, send_json, ServiceError};
use crate::config::PushConfig;
use crate::database::models::push_subscription::PushSubscription;

const SERVICE: &str = "push gateway";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The push service no longer knows the subscription; it should be dropped
    Expired,
    Failed(String),
}

/// Web push delivery through a relay that owns the VAPID keys and payload
/// encryption. Only configuration problems are errors; per-subscription
/// problems are reported as outcomes.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn deliver(&self, subscription: &PushSubscription, message: &PushMessage) -> Result<DeliveryOutcome, ServiceError>;
}

pub struct HttpPushGateway {
    client: Client,
    base: Option<Url>,
    api_key: String,
    ttl_secs: u32,
}

impl HttpPushGateway {
    pub fn new(client: Client, config: &PushConfig) -> Self {
        Self {
            client,
            base: parse_base(SERVICE, &config.gateway_url),
            api_key: config.api_key.clone(),
            ttl_secs: config.ttl_secs,
        }
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn deliver(&self, subscription: &PushSubscription, message: &PushMessage) -> Result<DeliveryOutcome, ServiceError> {
        let base = self.base.as_ref().ok_or(ServiceError::NotConfigured(SERVICE))?;
        let url = endpoint(base, SERVICE, &["send"])?;

        let body = json!({
            "subscription": {
                "endpoint": subscription.endpoint,
                "keys": { "p256dh": subscription.p256dh, "auth": subscription.auth },
            },
            "payload": message,
            "ttl": self.ttl_secs,
        });

        let mut request = self.client.post(url).json(&body);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        match send_json(SERVICE, request).await {
            Ok(_) => Ok(DeliveryOutcome::Delivered),
            Err(ServiceError::Upstream { status: 404 | 410, .. }) => Ok(DeliveryOutcome::Expired),
            Err(err) => {
                tracing::warn!("Push delivery failed: {}", err);
                Ok(DeliveryOutcome::Failed(err.to_string()))
            }
        }
    }
}
