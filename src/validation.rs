use uuid::Uuid;

use crate::error::{ApiError, FieldErrors};

/// Collects per-field problems so one response reports all of them
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, problem: impl Into<String>) {
        self.errors.entry(field.to_string()).or_insert_with(|| problem.into());
    }

    /// Required, non-blank, at most `max` characters. Returns the trimmed text.
    pub fn required_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        match value.map(str::trim) {
            None | Some("") => {
                self.add(field, "is required");
                None
            }
            Some(text) => self.check_length(field, text, max),
        }
    }

    /// Optional text: blank becomes `None`, otherwise trimmed and length-checked
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        match value.map(str::trim) {
            None | Some("") => None,
            Some(text) => self.check_length(field, text, max),
        }
    }

    fn check_length(&mut self, field: &str, text: &str, max: usize) -> Option<String> {
        if text.chars().count() > max {
            self.add(field, format!("must be at most {} characters", max));
            None
        } else {
            Some(text.to_string())
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.add(field, format!("must be one of: {}", allowed.join(", ")));
        }
    }

    pub fn positive(&mut self, field: &str, value: f64) {
        if !value.is_finite() || value <= 0.0 {
            self.add(field, "must be greater than 0");
        }
    }

    pub fn within(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() || value < min || value > max {
            self.add(field, format!("must be between {} and {}", min, max));
        }
    }

    pub fn check(&mut self, condition: bool, field: &str, problem: impl Into<String>) {
        if !condition {
            self.add(field, problem);
        }
    }

    /// 400 `VALIDATION_ERROR` listing every failed field
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let summary = self
            .errors
            .iter()
            .map(|(field, problem)| format!("{} {}", field, problem))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ApiError::validation_error(summary, Some(self.errors)))
    }
}

/// Parse a path segment as a record id
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid id '{}'", raw)))
}

/// Clamp an optional `limit` query parameter
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}
