// src/services/jwt_service.rs
use crate::config::{ConfigError, JwtConfig};
use crate::models::jwt::{ClaimSet, Claims, IssuedToken, TokenKind, TokenPair};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::Error as JwtError, errors::ErrorKind, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use std::sync::Arc;
use thiserror::Error;

/// Why a presented token was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token malformed or signature invalid")]
    Invalid,
    #[error("token is of the wrong class")]
    WrongKind,
}

struct Keys {
    enc: EncodingKey,
    dec: DecodingKey,
    lifetime: Duration,
}

/// Issues and verifies access and refresh tokens.
///
/// The two classes are signed with separate secrets, so a leaked access key
/// cannot mint refresh tokens and vice versa.
#[derive(Clone)]
pub struct JwtService {
    access: Arc<Keys>,
    refresh: Arc<Keys>,
    validation: Validation,
}

impl JwtService {
    /// Fails on a lifetime that is not positive or cannot produce an expiry.
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5;

        Ok(Self {
            access: Arc::new(Keys {
                enc: EncodingKey::from_secret(config.access_secret.as_bytes()),
                dec: DecodingKey::from_secret(config.access_secret.as_bytes()),
                lifetime: config.access_ttl()?,
            }),
            refresh: Arc::new(Keys {
                enc: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
                dec: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
                lifetime: config.refresh_ttl()?,
            }),
            validation,
        })
    }

    /* ---------- PUBLIC API ---------- */

    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        self.keys(kind).lifetime
    }

    pub fn issue(&self, kind: TokenKind, claims: &ClaimSet) -> Result<IssuedToken, JwtError> {
        self.issue_at(kind, claims, Utc::now())
    }

    /// Sign a token as if issued at `now`.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        claims: &ClaimSet,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, JwtError> {
        let keys = self.keys(kind);
        let claims = Claims::new(kind, claims, now, keys.lifetime);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.enc)?;

        Ok(IssuedToken {
            token,
            expires_at: now + keys.lifetime,
            lifetime: keys.lifetime,
        })
    }

    pub fn issue_pair(&self, claims: &ClaimSet) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access: self.issue(TokenKind::Access, claims)?,
            refresh: self.issue(TokenKind::Refresh, claims)?,
        })
    }

    /// Check signature, expiry and class of `token`.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.keys(kind).dec, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?;

        if claims.token_type != kind {
            return Err(TokenError::WrongKind);
        }
        Ok(claims)
    }

    /* ---------- PRIVATE HELPERS ---------- */

    fn keys(&self, kind: TokenKind) -> &Keys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::role::Role;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-for-tests".to_string(),
            refresh_secret: "refresh-secret-for-tests".to_string(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
        }
    }

    fn claim_set() -> ClaimSet {
        ClaimSet {
            principal_id: 42,
            role: Role::Instructor,
            email: Some("ada@example.com".to_string()),
        }
    }

    #[test]
    fn issued_access_token_verifies() {
        let jwt = JwtService::new(&test_config()).unwrap();
        let issued = jwt.issue(TokenKind::Access, &claim_set()).unwrap();

        let claims = jwt.verify(TokenKind::Access, &issued.token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Instructor);
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn refresh_lifetime_is_days() {
        let jwt = JwtService::new(&test_config()).unwrap();
        let issued = jwt.issue(TokenKind::Refresh, &claim_set()).unwrap();

        let claims = jwt.verify(TokenKind::Refresh, &issued.token).unwrap();
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
        assert_eq!(issued.lifetime, Duration::days(7));
    }

    #[test]
    fn classes_do_not_cross_verify() {
        let jwt = JwtService::new(&test_config()).unwrap();
        let access = jwt.issue(TokenKind::Access, &claim_set()).unwrap();
        let refresh = jwt.issue(TokenKind::Refresh, &claim_set()).unwrap();

        // Different secrets, so the signature check fails first.
        assert_eq!(
            jwt.verify(TokenKind::Refresh, &access.token).unwrap_err(),
            TokenError::Invalid
        );
        assert_eq!(
            jwt.verify(TokenKind::Access, &refresh.token).unwrap_err(),
            TokenError::Invalid
        );
    }

    #[test]
    fn wrong_class_with_shared_key_is_rejected() {
        let mut config = test_config();
        config.refresh_secret = config.access_secret.clone();
        let jwt = JwtService::new(&config).unwrap();
        let refresh = jwt.issue(TokenKind::Refresh, &claim_set()).unwrap();

        assert_eq!(
            jwt.verify(TokenKind::Access, &refresh.token).unwrap_err(),
            TokenError::WrongKind
        );
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let jwt = JwtService::new(&test_config()).unwrap();
        let issued = jwt
            .issue_at(TokenKind::Refresh, &claim_set(), Utc::now() - Duration::days(8))
            .unwrap();

        assert_eq!(
            jwt.verify(TokenKind::Refresh, &issued.token).unwrap_err(),
            TokenError::Expired
        );
    }

    #[test]
    fn tampered_token_is_invalid() {
        let jwt = JwtService::new(&test_config()).unwrap();
        let issued = jwt.issue(TokenKind::Access, &claim_set()).unwrap();
        let tampered = format!("{}x", issued.token);

        assert_eq!(jwt.verify(TokenKind::Access, &tampered).unwrap_err(), TokenError::Invalid);
        assert_eq!(jwt.verify(TokenKind::Access, "not-a-jwt").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn unusable_lifetimes_are_refused() {
        let mut config = test_config();
        config.refresh_ttl_days = i64::MAX / 1000;
        assert!(matches!(
            JwtService::new(&config),
            Err(ConfigError::Invalid { var: "REFRESH_TOKEN_TTL_DAYS", .. })
        ));

        let mut config = test_config();
        config.access_ttl_minutes = -5;
        assert!(JwtService::new(&config).is_err());
    }

    #[test]
    fn every_token_is_unique() {
        let jwt = JwtService::new(&test_config()).unwrap();
        let a = jwt.issue(TokenKind::Refresh, &claim_set()).unwrap();
        let b = jwt.issue(TokenKind::Refresh, &claim_set()).unwrap();
        assert_ne!(a.token, b.token);
    }
}
