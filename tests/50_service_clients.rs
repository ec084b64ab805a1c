// HTTP clients against an in-process fake upstream

use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use studyhub_api::config::{AiConfig, AuthConfig, CalendarConfig, MailConfig, PushConfig};
use studyhub_api::database::models::push_subscription::PushSubscription;
use studyhub_api::services::{
    http_client, CalendarProvider, CompletionProvider, CompletionRequest, DeliveryOutcome, Email, HttpCalendarProvider,
    HttpCompletionProvider, HttpMailer, HttpPlatformAuth, HttpPushGateway, Mailer, PlatformAuth, PushGateway,
    PushMessage, ServiceError,
};

#[derive(Clone, Default)]
struct Upstream {
    seen: Arc<Mutex<Vec<Value>>>,
}

impl Upstream {
    fn record(&self, value: Value) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(value);
        }
    }

    fn seen(&self) -> Vec<Value> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn platform_user(State(upstream): State<Upstream>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    upstream.record(json!({ "apikey": header(&headers, "apikey"), "auth": header(&headers, "authorization") }));
    if header(&headers, "authorization") != "Bearer user-token" {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "id": "u-1", "factors": [{ "id": "f-1", "factor_type": "totp", "status": "verified" }] })),
    )
}

async fn platform_verify(Path(factor_id): Path<String>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["code"] == "000000" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "code": 422, "msg": "Invalid TOTP code entered" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "access_token": "aal2-token", "user": { "id": "u-1" }, "factor_id": factor_id })),
    )
}

async fn send_email(State(upstream): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    upstream.record(body);
    Json(json!({ "id": "email_42" }))
}

async fn push_send(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let endpoint = body["subscription"]["endpoint"].as_str().unwrap_or_default();
    if endpoint.ends_with("/gone") {
        (StatusCode::GONE, Json(json!({ "error": "subscription expired" })))
    } else if endpoint.ends_with("/boom") {
        (StatusCode::BAD_GATEWAY, Json(json!({ "error": "push service down" })))
    } else {
        (StatusCode::CREATED, Json(json!({ "queued": true })))
    }
}

async fn chat_completion(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "model": format!("{}-2024", body["model"].as_str().unwrap_or_default()),
        "choices": [{ "message": { "role": "assistant", "content": " Review chapter 3. " } }]
    }))
}

async fn calendar_events() -> Json<Value> {
    Json(json!({
        "items": [
            { "id": "g-1", "summary": "Exam", "start": { "dateTime": "2025-05-02T12:00:00Z" }, "end": { "dateTime": "2025-05-02T14:00:00Z" } },
            { "id": "g-2", "summary": "Holiday", "start": { "date": "2025-05-01" }, "end": { "date": "2025-05-02" } },
            { "summary": "no id, skipped" }
        ]
    }))
}

async fn spawn_upstream() -> Result<(String, Upstream)> {
    let upstream = Upstream::default();
    let router = Router::new()
        .route("/auth/v1/user", get(platform_user))
        .route("/auth/v1/factors/:id/verify", post(platform_verify))
        .route("/emails", post(send_email))
        .route("/send", post(push_send))
        .route("/v1/chat/completions", post(chat_completion))
        .route("/calendar/v3/calendars/primary/events", get(calendar_events))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((base_url, upstream))
}

fn auth_config(base_url: &str) -> AuthConfig {
    AuthConfig {
        platform_url: base_url.to_string(),
        anon_key: "anon-key".to_string(),
        jwt_secret: String::new(),
        jwt_audience: "authenticated".to_string(),
        mfa_issuer: "StudyHub (test)".to_string(),
    }
}

fn subscription(endpoint: &str) -> PushSubscription {
    PushSubscription {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        endpoint: endpoint.to_string(),
        p256dh: "BNc".to_string(),
        auth: "tBH".to_string(),
        user_agent: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn platform_auth_forwards_user_token_and_maps_errors() -> Result<()> {
    let (base_url, upstream) = spawn_upstream().await?;
    let platform = HttpPlatformAuth::new(http_client()?, &auth_config(&base_url));

    let factors = platform.list_factors("user-token").await?;
    assert_eq!(factors[0]["id"], "f-1");
    assert_eq!(upstream.seen()[0], json!({ "apikey": "anon-key", "auth": "Bearer user-token" }));

    let err = platform.list_factors("stale").await.unwrap_err();
    assert!(matches!(err, ServiceError::Upstream { status: 401, .. }), "{:?}", err);

    let session = platform.verify("user-token", "f-1", "c-1", "123456").await?;
    assert_eq!(session["access_token"], "aal2-token");
    assert_eq!(session["factor_id"], "f-1");

    match platform.verify("user-token", "f-1", "c-1", "000000").await {
        Err(ServiceError::Upstream { status, message, .. }) => {
            assert_eq!(status, 422);
            assert_eq!(message, "Invalid TOTP code entered");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn unconfigured_platform_is_reported() -> Result<()> {
    let platform = HttpPlatformAuth::new(http_client()?, &auth_config(""));
    let err = platform.list_factors("user-token").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotConfigured(_)));
    Ok(())
}

#[tokio::test]
async fn mailer_posts_with_sender_and_returns_id() -> Result<()> {
    let (base_url, upstream) = spawn_upstream().await?;
    let mailer = HttpMailer::new(
        http_client()?,
        &MailConfig {
            api_url: base_url,
            api_key: "re_test".to_string(),
            from: "StudyHub <noreply@studyhub.app>".to_string(),
        },
    );

    let id = mailer
        .send(&Email {
            to: vec!["ana@example.com".to_string()],
            subject: "Exam reminder".to_string(),
            html: None,
            text: Some("Tomorrow 9am".to_string()),
        })
        .await?;

    assert_eq!(id, "email_42");
    let sent = &upstream.seen()[0];
    assert_eq!(sent["from"], "StudyHub <noreply@studyhub.app>");
    assert_eq!(sent["to"], json!(["ana@example.com"]));
    assert_eq!(sent["text"], "Tomorrow 9am");
    assert!(sent.get("html").is_none());
    Ok(())
}

#[tokio::test]
async fn mailer_without_key_is_not_configured() -> Result<()> {
    let mailer = HttpMailer::new(
        http_client()?,
        &MailConfig {
            api_url: "https://api.resend.com".to_string(),
            api_key: String::new(),
            from: "x@y.z".to_string(),
        },
    );
    let email = Email {
        to: vec!["a@b.io".to_string()],
        subject: "s".to_string(),
        html: None,
        text: Some("t".to_string()),
    };
    assert!(matches!(mailer.send(&email).await, Err(ServiceError::NotConfigured(_))));
    Ok(())
}

#[tokio::test]
async fn push_gateway_classifies_outcomes() -> Result<()> {
    let (base_url, _) = spawn_upstream().await?;
    let gateway = HttpPushGateway::new(
        http_client()?,
        &PushConfig {
            gateway_url: base_url,
            api_key: String::new(),
            ttl_secs: 60,
        },
    );
    let message = PushMessage {
        title: "Exam tomorrow".to_string(),
        body: "Calculus II".to_string(),
        url: None,
    };

    let delivered = gateway.deliver(&subscription("https://push.example.com/ok"), &message).await?;
    assert_eq!(delivered, DeliveryOutcome::Delivered);

    let expired = gateway.deliver(&subscription("https://push.example.com/gone"), &message).await?;
    assert_eq!(expired, DeliveryOutcome::Expired);

    let failed = gateway.deliver(&subscription("https://push.example.com/boom"), &message).await?;
    assert!(matches!(failed, DeliveryOutcome::Failed(_)));
    Ok(())
}

#[tokio::test]
async fn completion_provider_reads_first_choice() -> Result<()> {
    let (base_url, _) = spawn_upstream().await?;
    let provider = HttpCompletionProvider::new(
        http_client()?,
        &AiConfig {
            api_url: format!("{}/v1", base_url),
            api_key: "sk-test".to_string(),
            model: "tutor".to_string(),
            max_prompt_chars: 1000,
            max_tokens: 100,
        },
    );

    let completion = provider
        .complete(&CompletionRequest {
            system: "Be brief".to_string(),
            prompt: "How should I study?".to_string(),
        })
        .await?;
    assert_eq!(completion.text, "Review chapter 3.");
    assert_eq!(completion.model, "tutor-2024");
    Ok(())
}

#[tokio::test]
async fn calendar_provider_parses_timed_and_all_day_events() -> Result<()> {
    let (base_url, _) = spawn_upstream().await?;
    let provider = HttpCalendarProvider::new(
        http_client()?,
        &CalendarConfig {
            api_url: format!("{}/calendar/v3", base_url),
            calendar_id: "primary".to_string(),
        },
    );

    let from = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 5, 31, 0, 0, 0).unwrap();
    let events = provider.list_events("ya29.token", from, to).await?;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].id, "g-1");
    assert_eq!(events[0].title, "Exam");
    assert!(!events[0].all_day);
    assert!(events[1].all_day);
    Ok(())
}
