// handlers/protected/push.rs - /api/push

use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::database::models::notification::{Channel, NewNotification, Notification};
use crate::database::models::push_subscription::{NewPushSubscription, PushSubscription};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiResponse, ApiResult, AuthUser};
use crate::services::{DeliveryOutcome, PushMessage};
use crate::state::AppState;
use crate::validation::Validator;

const MAX_ENDPOINT: usize = 2048;
const MAX_KEY: usize = 512;
const MAX_TITLE: usize = 120;
const MAX_BODY: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: Option<String>,
    pub auth: Option<String>,
}

/// Shape of a browser `PushSubscription.toJSON()`
#[derive(Debug, Default, Deserialize)]
pub struct SubscribePayload {
    pub endpoint: Option<String>,
    #[serde(default)]
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribePayload {
    pub endpoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct SendReport {
    pub sent: usize,
    pub expired: usize,
    pub failed: usize,
}

fn validate_subscription(payload: &SubscribePayload, user_agent: Option<String>) -> Result<NewPushSubscription, ApiError> {
    let mut v = Validator::new();
    let endpoint = v.required_text("endpoint", payload.endpoint.as_deref(), MAX_ENDPOINT);
    if let Some(endpoint) = &endpoint {
        let secure = url::Url::parse(endpoint).map(|u| u.scheme() == "https").unwrap_or(false);
        v.check(secure, "endpoint", "must be an https URL");
    }
    let p256dh = v.required_text("keys.p256dh", payload.keys.p256dh.as_deref(), MAX_KEY);
    let auth = v.required_text("keys.auth", payload.keys.auth.as_deref(), MAX_KEY);
    v.finish()?;

    Ok(NewPushSubscription {
        endpoint: endpoint.unwrap_or_default(),
        p256dh: p256dh.unwrap_or_default(),
        auth: auth.unwrap_or_default(),
        user_agent,
    })
}

fn validate_message(payload: &SendPayload) -> Result<PushMessage, ApiError> {
    let mut v = Validator::new();
    let title = v.required_text("title", payload.title.as_deref(), MAX_TITLE);
    let body = v.required_text("body", payload.body.as_deref(), MAX_BODY);
    let url = v.optional_text("url", payload.url.as_deref(), MAX_ENDPOINT);
    v.finish()?;

    Ok(PushMessage {
        title: title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        url,
    })
}

/// POST /api/push/subscribe - Register (or refresh) a browser subscription
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<SubscribePayload>,
) -> ApiResult<PushSubscription> {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|ua| ua.chars().take(MAX_KEY).collect());
    let new = validate_subscription(&payload, user_agent)?;

    let subscription = PushSubscription::upsert(&state.pool, user.id, new).await?;
    tracing::debug!("User {} subscribed push endpoint {}", user.id, subscription.id);
    Ok(ApiResponse::created(subscription))
}

/// DELETE /api/push/subscribe - Remove a subscription by endpoint
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<UnsubscribePayload>,
) -> ApiResult<Value> {
    let mut v = Validator::new();
    let endpoint = v.required_text("endpoint", payload.endpoint.as_deref(), MAX_ENDPOINT);
    v.finish()?;
    let endpoint = endpoint.unwrap_or_default();

    if !PushSubscription::delete_by_endpoint(&state.pool, user.id, &endpoint).await? {
        return Err(ApiError::not_found("Subscription not found"));
    }
    Ok(ApiResponse::success(json!({ "endpoint": endpoint, "removed": true })))
}

/// POST /api/push/send - Fan a message out to every subscription of the caller
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<SendPayload>,
) -> ApiResult<SendReport> {
    let message = validate_message(&payload)?;
    let subscriptions = PushSubscription::list(&state.pool, user.id).await?;

    let gateway = state.push.as_ref();
    let message_ref = &message;
    let deliveries = subscriptions.iter().map(|subscription| async move {
        (subscription.id, gateway.deliver(subscription, message_ref).await)
    });

    let mut report = SendReport::default();
    let mut expired = Vec::new();
    for (id, outcome) in join_all(deliveries).await {
        match outcome? {
            DeliveryOutcome::Delivered => report.sent += 1,
            DeliveryOutcome::Expired => {
                report.expired += 1;
                expired.push(id);
            }
            DeliveryOutcome::Failed(reason) => {
                tracing::warn!("Push delivery to subscription {} failed: {}", id, reason);
                report.failed += 1;
            }
        }
    }

    if !expired.is_empty() {
        let removed = PushSubscription::delete_ids(&state.pool, user.id, &expired).await?;
        tracing::info!("Removed {} expired push subscriptions for user {}", removed, user.id);
    }

    Notification::record(
        &state.pool,
        user.id,
        NewNotification {
            title: message.title,
            body: message.body,
            kind: "push".to_string(),
            channel: Channel::Push,
        },
    )
    .await?;

    Ok(ApiResponse::success(report))
}
