use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// Lifetime class of a token. Each class has its own secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// What the caller asks to be put into a token.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    pub principal_id: i64,
    pub role: Role,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,          // principal id
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,          // issued at
    pub exp: i64,          // expiration time
    pub jti: String,       // unique per token
    pub token_type: TokenKind,
}

/// A signed token together with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub lifetime: Duration,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl Claims {
    pub fn new(kind: TokenKind, claims: &ClaimSet, now: DateTime<Utc>, lifetime: Duration) -> Self {
        Self {
            sub: claims.principal_id,
            role: claims.role,
            email: claims.email.clone(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: kind,
        }
    }
}
