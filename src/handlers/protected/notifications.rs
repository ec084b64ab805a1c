// handlers/protected/notifications.rs - /api/notifications

use axum::extract::{Extension, Path, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::notification::{Channel, NewNotification, Notification};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::Email;
use crate::state::AppState;
use crate::validation::{clamp_limit, parse_id, Validator};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;
const MAX_TITLE: usize = 200;
const MAX_BODY: usize = 5000;
const MAX_KIND: usize = 40;
const MAX_SUBJECT: usize = 250;
const MAX_EMAIL_BODY: usize = 200_000;
const MAX_RECIPIENTS: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub unread: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub kind: Option<String>,
}

/// `to` may be a single address or a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailPayload {
    pub to: Option<Recipients>,
    pub subject: Option<String>,
    pub html: Option<String>,
    pub text: Option<String>,
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !address.contains(char::is_whitespace),
        None => false,
    }
}

/// Build the outgoing message; recipients fall back to the caller's own address
fn validate_email(payload: &EmailPayload, fallback: Option<&str>) -> Result<Email, ApiError> {
    let mut v = Validator::new();
    let subject = v.required_text("subject", payload.subject.as_deref(), MAX_SUBJECT);
    let html = v.optional_text("html", payload.html.as_deref(), MAX_EMAIL_BODY);
    let text = v.optional_text("text", payload.text.as_deref(), MAX_EMAIL_BODY);
    v.check(html.is_some() || text.is_some(), "body", "html or text is required");

    let to: Vec<String> = match &payload.to {
        Some(Recipients::One(address)) => vec![address.trim().to_string()],
        Some(Recipients::Many(addresses)) => addresses.iter().map(|a| a.trim().to_string()).collect(),
        None => fallback.map(|address| vec![address.to_string()]).unwrap_or_default(),
    };
    let to: Vec<String> = to.into_iter().filter(|a| !a.is_empty()).collect();
    if to.is_empty() {
        v.add("to", "is required when the session has no email");
    } else if to.len() > MAX_RECIPIENTS {
        v.add("to", format!("at most {} recipients", MAX_RECIPIENTS));
    } else if let Some(bad) = to.iter().find(|a| !looks_like_email(a)) {
        v.add("to", format!("'{}' is not a valid email address", bad));
    }
    v.finish()?;

    Ok(Email {
        to,
        subject: subject.unwrap_or_default(),
        html,
        text,
    })
}

/// Plain-text preview for the in-app history entry
fn history_body(email: &Email) -> String {
    let source = email.text.as_deref().or(email.html.as_deref()).unwrap_or_default();
    source.chars().take(MAX_BODY).collect()
}

/// GET /api/notifications - Newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> ApiResult<Vec<Notification>> {
    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT);
    let unread_only = query.unread.unwrap_or(false);
    Ok(ApiResponse::success(
        Notification::list(&state.pool, user.id, unread_only, limit).await?,
    ))
}

/// POST /api/notifications - Record an in-app notification for the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<NotificationPayload>,
) -> ApiResult<Notification> {
    let mut v = Validator::new();
    let title = v.required_text("title", payload.title.as_deref(), MAX_TITLE);
    let body = v.optional_text("body", payload.body.as_deref(), MAX_BODY);
    let kind = v.optional_text("kind", payload.kind.as_deref(), MAX_KIND);
    v.finish()?;

    let new = NewNotification {
        title: title.unwrap_or_default(),
        body: body.unwrap_or_default(),
        kind: kind.unwrap_or_else(|| "info".to_string()),
        channel: Channel::InApp,
    };
    Ok(ApiResponse::created(Notification::record(&state.pool, user.id, new).await?))
}

/// POST /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(Notification::mark_read(&state.pool, user.id, id).await?))
}

/// POST /api/notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let updated = Notification::mark_all_read(&state.pool, user.id).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })))
}

/// DELETE /api/notifications/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let id = parse_id(&id)?;
    Ok(ApiResponse::success(Notification::delete(&state.pool, user.id, id).await?))
}

/// POST /api/notifications/email - Send a transactional email and log it
pub async fn send_email(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<EmailPayload>,
) -> ApiResult<Value> {
    let email = validate_email(&payload, user.email.as_deref())?;

    let message_id = state.mailer.send(&email).await?;
    tracing::info!("Sent email {} for user {} to {} recipient(s)", message_id, user.id, email.to.len());

    let record = NewNotification {
        title: email.subject.clone(),
        body: history_body(&email),
        kind: "email".to_string(),
        channel: Channel::Email,
    };
    // The message is already out; a history failure must not turn it into an error
    if let Err(e) = Notification::record(&state.pool, user.id, record).await {
        tracing::error!("Failed to record email notification {}: {}", message_id, e);
    }

    Ok(ApiResponse::success(json!({
        "id": message_id,
        "to": email.to,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_defaults_recipient_to_session() {
        let payload = EmailPayload {
            subject: Some("Weekly digest".into()),
            text: Some("3 exams this week".into()),
            ..Default::default()
        };
        let email = validate_email(&payload, Some("ana@example.com")).unwrap();
        assert_eq!(email.to, vec!["ana@example.com".to_string()]);

        let body = validate_email(&payload, None).unwrap_err().to_json();
        assert_eq!(body["field_errors"]["to"], "is required when the session has no email");
    }

    #[test]
    fn email_requires_subject_and_content() {
        let body = validate_email(&EmailPayload::default(), Some("ana@example.com"))
            .unwrap_err()
            .to_json();
        assert_eq!(body["field_errors"]["subject"], "is required");
        assert_eq!(body["field_errors"]["body"], "html or text is required");
    }

    #[test]
    fn accepts_single_or_many_recipients() {
        let single: EmailPayload =
            serde_json::from_value(json!({"to": "a@b.io", "subject": "Hi", "html": "<p>Hi</p>"})).unwrap();
        assert_eq!(validate_email(&single, None).unwrap().to, vec!["a@b.io".to_string()]);

        let many: EmailPayload =
            serde_json::from_value(json!({"to": ["a@b.io", "nope"], "subject": "Hi", "text": "Hi"})).unwrap();
        assert!(validate_email(&many, None).is_err());
    }

    #[test]
    fn history_prefers_text() {
        let email = Email {
            to: vec!["a@b.io".into()],
            subject: "Hi".into(),
            html: Some("<p>Hi</p>".into()),
            text: Some("Hi".into()),
        };
        assert_eq!(history_body(&email), "Hi");
    }
}
