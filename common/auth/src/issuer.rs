use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;
use tracing::debug;

use crate::config::JwtConfig;
use crate::error::{AuthError, AuthResult};

pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mints HS256 session tokens from an arbitrary identity object.
pub struct TokenIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret());
        Self {
            config,
            encoding_key,
        }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn issue(&self, claims: Value) -> AuthResult<IssuedToken> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a token as if signed at `now`. `iat` and `exp` in the payload
    /// are always overwritten.
    pub fn issue_at(&self, claims: Value, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let mut payload = match claims {
            Value::Object(map) => map,
            other => return Err(AuthError::InvalidClaims(json_kind(&other).to_string())),
        };

        let expires_at = now + Duration::seconds(self.config.ttl_seconds);
        payload.insert("iat".into(), Value::from(now.timestamp()));
        payload.insert("exp".into(), Value::from(expires_at.timestamp()));

        let token = encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|err| AuthError::Signing(err.to_string()))?;
        debug!(email = ?payload.get("email"), %expires_at, "issued session token");

        Ok(IssuedToken { token, expires_at })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
