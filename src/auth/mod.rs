use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access token claims as issued by the platform's auth service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Authenticator assurance level: `aal1`, or `aal2` after an MFA verify
    #[serde(default)]
    pub aal: Option<String>,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, audience: &str, expiry: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role: Some("authenticated".to_string()),
            aal: Some("aal1".to_string()),
            session_id: Some(Uuid::new_v4()),
            aud: audience.to_string(),
            exp: (now + expiry).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    Invalid(String),
}

/// Verifies platform-issued HS256 tokens
#[derive(Clone)]
pub struct TokenVerifier {
    key: Option<DecodingKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: (!secret.is_empty()).then(|| DecodingKey::from_secret(secret.as_bytes())),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let key = self.key.as_ref().ok_or(JwtError::MissingSecret)?;
        decode::<Claims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| JwtError::Invalid(e.to_string()))
    }
}

/// Sign a token the way the platform does; used by the dev CLI and tests
pub fn sign_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}
