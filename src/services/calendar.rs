use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use url::Url;

use super::{endpoint, parse_base, send_json, ServiceError};
use crate::config::CalendarConfig;
use crate::database::models::calendar_event::CalendarEvent;

const SERVICE: &str = "calendar provider";

/// An event as the provider reports it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub link: Option<String>,
}

/// The user's external calendar, reached with the OAuth provider token the
/// platform handed out at sign-in.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn list_events(
        &self,
        provider_token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, ServiceError>;

    /// Create the event remotely, or update it when it already has an external id
    async fn upsert_event(&self, provider_token: &str, event: &CalendarEvent) -> Result<ExternalEvent, ServiceError>;
}

pub struct HttpCalendarProvider {
    client: Client,
    base: Option<Url>,
    calendar_id: String,
}

impl HttpCalendarProvider {
    pub fn new(client: Client, config: &CalendarConfig) -> Self {
        Self {
            client,
            base: parse_base(SERVICE, &config.api_url),
            calendar_id: config.calendar_id.clone(),
        }
    }

    fn events_url(&self, extra: Option<&str>) -> Result<Url, ServiceError> {
        let base = self.base.as_ref().ok_or(ServiceError::NotConfigured(SERVICE))?;
        let mut segments = vec!["calendars", self.calendar_id.as_str(), "events"];
        if let Some(id) = extra {
            segments.push(id);
        }
        endpoint(base, SERVICE, &segments)
    }
}

#[async_trait]
impl CalendarProvider for HttpCalendarProvider {
    async fn list_events(
        &self,
        provider_token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<ExternalEvent>, ServiceError> {
        let mut url = self.events_url(None)?;
        url.query_pairs_mut()
            .append_pair("timeMin", &from.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("timeMax", &to.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let body = send_json(SERVICE, self.client.get(url).bearer_auth(provider_token)).await?;
        let items = body.get("items").and_then(Value::as_array).cloned().unwrap_or_default();
        Ok(items.iter().filter_map(parse_event).collect())
    }

    async fn upsert_event(&self, provider_token: &str, event: &CalendarEvent) -> Result<ExternalEvent, ServiceError> {
        let body = event_body(event);
        let request = match &event.external_id {
            Some(external_id) => self.client.patch(self.events_url(Some(external_id.as_str()))?),
            None => self.client.post(self.events_url(None)?),
        };

        let response = send_json(SERVICE, request.bearer_auth(provider_token).json(&body)).await?;
        parse_event(&response).ok_or_else(|| ServiceError::Decode {
            service: SERVICE,
            message: "event without id".to_string(),
        })
    }
}

fn event_body(event: &CalendarEvent) -> Value {
    let (start, end) = if event.all_day {
        (
            json!({ "date": event.starts_at.date_naive().to_string() }),
            // All-day end dates are exclusive
            json!({ "date": (event.ends_at.date_naive() + chrono::Duration::days(1)).to_string() }),
        )
    } else {
        (
            json!({ "dateTime": event.starts_at.to_rfc3339_opts(SecondsFormat::Secs, true) }),
            json!({ "dateTime": event.ends_at.to_rfc3339_opts(SecondsFormat::Secs, true) }),
        )
    };

    json!({
        "summary": event.title,
        "description": event.description,
        "start": start,
        "end": end,
    })
}

fn parse_event(value: &Value) -> Option<ExternalEvent> {
    let id = value.get("id")?.as_str()?.to_string();
    let (starts_at, start_all_day) = parse_moment(value.get("start"));
    let (ends_at, _) = parse_moment(value.get("end"));

    Some(ExternalEvent {
        id,
        title: value.get("summary").and_then(Value::as_str).unwrap_or("(untitled)").to_string(),
        description: value.get("description").and_then(Value::as_str).map(str::to_string),
        starts_at,
        ends_at,
        all_day: start_all_day,
        link: value.get("htmlLink").and_then(Value::as_str).map(str::to_string),
    })
}

/// `{"dateTime": rfc3339}` or `{"date": yyyy-mm-dd}` (all-day)
fn parse_moment(value: Option<&Value>) -> (Option<DateTime<Utc>>, bool) {
    let Some(value) = value else {
        return (None, false);
    };
    if let Some(raw) = value.get("dateTime").and_then(Value::as_str) {
        let parsed = DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc));
        return (parsed, false);
    }
    if let Some(raw) = value.get("date").and_then(Value::as_str) {
        let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc());
        return (parsed, true);
    }
    (None, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn parses_timed_and_all_day_events() {
        let timed = parse_event(&json!({
            "id": "abc",
            "summary": "Calculus exam",
            "htmlLink": "https://calendar.example.com/abc",
            "start": { "dateTime": "2025-05-02T09:00:00-03:00" },
            "end": { "dateTime": "2025-05-02T11:00:00-03:00" }
        }))
        .unwrap();
        assert_eq!(timed.starts_at, Some(Utc.with_ymd_and_hms(2025, 5, 2, 12, 0, 0).unwrap()));
        assert!(!timed.all_day);
        assert_eq!(timed.link.as_deref(), Some("https://calendar.example.com/abc"));

        let all_day = parse_event(&json!({
            "id": "def",
            "start": { "date": "2025-05-03" },
            "end": { "date": "2025-05-04" }
        }))
        .unwrap();
        assert!(all_day.all_day);
        assert_eq!(all_day.title, "(untitled)");
        assert_eq!(all_day.starts_at, Some(Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap()));

        assert!(parse_event(&json!({ "summary": "no id" })).is_none());
    }

    #[test]
    fn all_day_body_uses_exclusive_end_date() {
        let start = Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap();
        let event = CalendarEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            discipline_id: None,
            title: "Holiday".to_string(),
            description: None,
            starts_at: start,
            ends_at: start,
            all_day: true,
            external_id: None,
            created_at: start,
            updated_at: start,
        };

        let body = event_body(&event);
        assert_eq!(body["start"]["date"], "2025-05-03");
        assert_eq!(body["end"]["date"], "2025-05-04");
        assert_eq!(body["summary"], "Holiday");
    }
}
