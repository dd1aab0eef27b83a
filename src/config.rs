use chrono::{Duration, Utc};
use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite:learnhub.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
    #[error("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ")]
    SharedSecret,
}

/// Signing material and lifetimes for the two token classes.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub secure: bool,
}

/// Route patterns the edge guard acts on.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub admin_prefixes: Vec<String>,
    pub auth_pages: Vec<String>,
    pub login_path: String,
    pub admin_landing: String,
    pub user_landing: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            admin_prefixes: vec!["/admin".to_string()],
            auth_pages: vec!["/login".to_string(), "/signup".to_string()],
            login_path: "/login".to_string(),
            admin_landing: "/admin".to_string(),
            user_landing: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub cookies: CookieConfig,
    pub guard: GuardConfig,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first.
    ///
    /// Both signing secrets are mandatory; their absence is reported here so
    /// the server refuses to start rather than failing per request.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let bind_addr = optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::Invalid {
            var: "BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        let defaults = GuardConfig::default();
        let guard = GuardConfig {
            admin_prefixes: optional("ADMIN_PREFIXES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.admin_prefixes),
            auth_pages: optional("AUTH_PAGES")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.auth_pages),
            login_path: optional("LOGIN_PATH").unwrap_or(defaults.login_path),
            admin_landing: optional("ADMIN_LANDING").unwrap_or(defaults.admin_landing),
            user_landing: optional("USER_LANDING").unwrap_or(defaults.user_landing),
        };

        Ok(Self {
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr,
            jwt: JwtConfig::from_env()?,
            cookies: CookieConfig {
                secure: parse_or("COOKIE_SECURE", production)?,
            },
            guard,
            bcrypt_cost: checked_bcrypt_cost(parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?)?,
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let access_secret = required("ACCESS_TOKEN_SECRET")?;
        let refresh_secret = required("REFRESH_TOKEN_SECRET")?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let config = Self {
            access_secret,
            refresh_secret,
            access_ttl_minutes: parse_or("ACCESS_TOKEN_TTL_MINUTES", DEFAULT_ACCESS_TTL_MINUTES)?,
            refresh_ttl_days: parse_or("REFRESH_TOKEN_TTL_DAYS", DEFAULT_REFRESH_TTL_DAYS)?,
        };
        config.access_ttl()?;
        config.refresh_ttl()?;
        Ok(config)
    }

    pub fn access_ttl(&self) -> Result<Duration, ConfigError> {
        checked_ttl(
            "ACCESS_TOKEN_TTL_MINUTES",
            self.access_ttl_minutes,
            Duration::try_minutes,
        )
    }

    pub fn refresh_ttl(&self) -> Result<Duration, ConfigError> {
        checked_ttl(
            "REFRESH_TOKEN_TTL_DAYS",
            self.refresh_ttl_days,
            Duration::try_days,
        )
    }
}

/// A lifetime must be positive and still yield a representable expiry.
fn checked_ttl(
    var: &'static str,
    value: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    to_duration(value)
        .filter(|ttl| *ttl > Duration::zero())
        .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
}

fn checked_bcrypt_cost(cost: u32) -> Result<u32, ConfigError> {
    if BCRYPT_COST_RANGE.contains(&cost) {
        Ok(cost)
    } else {
        Err(ConfigError::Invalid {
            var: "BCRYPT_COST",
            value: cost.to_string(),
        })
    }
}

fn optional(var: &'static str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    optional(var).ok_or(ConfigError::Missing(var))
}

fn parse_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
