//! JWT token generation and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuthError, AuthResult, DEFAULT_JWT_EXPIRATION_HOURS, DEFAULT_JWT_ISSUER};

/// Token subject: the numeric user id.
///
/// Issued as a JSON integer; a decimal string is accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Id(i64),
    Text(String),
}

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Subject,
    #[serde(default)]
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Creates claims for a user expiring after `expiration_hours`.
    pub fn new(user_id: i64, email: String, expiration_hours: u64, issuer: &str) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: Subject::Id(user_id),
            email,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: issuer.to_string(),
            jti: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Returns the user ID carried in `sub`.
    pub fn user_id(&self) -> AuthResult<i64> {
        match &self.sub {
            Subject::Id(id) => Ok(*id),
            Subject::Text(text) => text.trim().parse().map_err(|_| AuthError::InvalidToken),
        }
    }
}

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: u64,
    /// Required `iss` of every accepted token.
    pub issuer: String,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            issuer: DEFAULT_JWT_ISSUER.to_string(),
        }
    }

    pub fn with_expiration_hours(mut self, hours: u64) -> Self {
        self.expiration_hours = hours;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }
}

/// Issues and validates HS256 access tokens.
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generates an access token for a user.
    pub fn generate_token(&self, user_id: i64, email: impl Into<String>) -> AuthResult<String> {
        let claims = Claims::new(
            user_id,
            email.into(),
            self.config.expiration_hours,
            &self.config.issuer,
        );

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::JwtEncoding(e.to_string()))
    }

    /// Validates signature, expiry and issuer, then decodes the claims.
    pub fn validate_token(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}
