use bcrypt::{hash, verify};
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult, RefreshFailure};
use crate::models::jwt::{ClaimSet, IssuedToken, TokenKind, TokenPair};
use crate::models::role::Role;
use crate::models::user::User;
use crate::services::jwt_service::{JwtService, TokenError};

/// Principal lifecycle: signup, login, refresh and logout.
#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    jwt: JwtService,
    bcrypt_cost: u32,
}

/// What a successful login hands back to the handler.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: TokenPair,
}

impl AuthService {
    pub fn new(pool: SqlitePool, jwt: JwtService, bcrypt_cost: u32) -> Self {
        Self {
            pool,
            jwt,
            bcrypt_cost,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> AppResult<User> {
        if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "name, email and password are required".to_string(),
            ));
        }
        let password_hash = hash(password, self.bcrypt_cost)?;
        // The UNIQUE index decides, so two signups racing for one email
        // cannot both get through.
        let user = User::create(&self.pool, name.trim(), email, &password_hash, Role::Student)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict("email already registered".to_string())
                }
                other => AppError::Database(other),
            })?;
        info!(user_id = user.id, "Registered new principal");
        Ok(user)
    }

    /// Verify credentials, issue a token pair and persist the refresh token,
    /// overwriting whatever was stored before.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginOutcome> {
        let user = User::find_by_email(&self.pool, email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "Password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.jwt.issue_pair(&claim_set(&user))?;
        User::set_refresh_token(&self.pool, user.id, Some(&tokens.refresh.token)).await?;

        info!(user_id = user.id, role = %user.role, "Login successful");
        Ok(LoginOutcome { user, tokens })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The token must be present, correctly signed, unexpired and identical to
    /// the value stored on the principal. The refresh token itself is left as is.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: Option<&str>) -> AppResult<IssuedToken> {
        let presented = refresh_token.ok_or(RefreshFailure::Missing)?;

        let claims = self
            .jwt
            .verify(TokenKind::Refresh, presented)
            .map_err(|e| {
                warn!(error = %e, "Refresh token rejected");
                match e {
                    TokenError::Expired => RefreshFailure::Expired,
                    TokenError::Invalid | TokenError::WrongKind => RefreshFailure::InvalidSignature,
                }
            })?;

        let Some(user) = User::find_by_id(&self.pool, claims.sub).await? else {
            warn!(user_id = claims.sub, "Refresh token names an unknown principal");
            return Err(RefreshFailure::Mismatch.into());
        };

        match user.refresh_token.as_deref() {
            Some(stored) if stored == presented => {}
            Some(_) => {
                warn!(user_id = user.id, "Refresh token superseded by a later login");
                return Err(RefreshFailure::Mismatch.into());
            }
            None => {
                warn!(user_id = user.id, "No refresh token stored, principal logged out");
                return Err(RefreshFailure::Mismatch.into());
            }
        }

        let access = self.jwt.issue(TokenKind::Access, &claim_set(&user))?;
        info!(user_id = user.id, "Issued refreshed access token");
        Ok(access)
    }

    /// Forget the stored refresh token if `refresh_token` is the one on record.
    ///
    /// A token that is unusable or already superseded has nothing left to
    /// revoke, so it is ignored rather than treated as an error. Returns the
    /// principal id whose session was ended.
    #[instrument(skip(self, refresh_token))]
    pub async fn logout(&self, refresh_token: Option<&str>) -> AppResult<Option<i64>> {
        let Some(token) = refresh_token else {
            return Ok(None);
        };

        let claims = match self.jwt.verify(TokenKind::Refresh, token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Logout with unusable refresh token");
                return Ok(None);
            }
        };

        let Some(user) = User::find_by_id(&self.pool, claims.sub).await? else {
            return Ok(None);
        };
        if user.refresh_token.as_deref() != Some(token) {
            warn!(user_id = user.id, "Logout with superseded refresh token");
            return Ok(None);
        }

        User::set_refresh_token(&self.pool, user.id, None).await?;
        info!(user_id = user.id, "Logged out");
        Ok(Some(user.id))
    }

    pub async fn find_user(&self, id: i64) -> AppResult<User> {
        User::find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::NotFound("user"))
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(User::list(&self.pool).await?)
    }
}

fn claim_set(user: &User) -> ClaimSet {
    ClaimSet {
        principal_id: user.id,
        role: user.role,
        email: Some(user.email.clone()),
    }
}
