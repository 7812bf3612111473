//! Auth and mail configuration, read once from the environment at startup.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::auth::password::{DEFAULT_BCRYPT_COST, MIN_BCRYPT_COST};

/// Shortest accepted `JWT_SECRET`.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Longest accepted access-token lifetime, in minutes (one day).
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 1440;
/// Longest accepted refresh-token lifetime, in days (ten years).
pub const MAX_REFRESH_TOKEN_DAYS: i64 = 3650;
/// Longest accepted reset-link lifetime, in minutes (one day).
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 1440;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var} ({hint})")]
    MissingRequired { var: &'static str, hint: &'static str },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Deployment environment. Production hides debugging aids such as the raw
/// reset token in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == AppEnv::Production
    }
}

/// `APP_ENV` named something other than a known environment.
#[derive(Debug, Error)]
#[error("unknown environment '{0}'")]
pub struct UnknownAppEnv(pub String);

impl FromStr for AppEnv {
    type Err = UnknownAppEnv;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnv::Production),
            "development" | "dev" | "test" => Ok(AppEnv::Development),
            other => Err(UnknownAppEnv(other.to_string())),
        }
    }
}

/// Token lifetimes, hashing cost and link base for the auth core.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub app_env: AppEnv,
    /// Base URL of the client app; reset links are `{public_url}/reset-password/{token}`.
    pub public_url: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("app_env", &self.app_env)
            .field("public_url", &self.public_url)
            .finish()
    }
}

impl AuthConfig {
    /// Defaults for everything but the secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::minutes(15),
            refresh_token_ttl: Duration::days(7),
            reset_token_ttl: Duration::minutes(10),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            app_env: AppEnv::Development,
            public_url: "http://localhost:3001".into(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingRequired {
                var: "JWT_SECRET",
                hint: "generate with: openssl rand -hex 32",
            })?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} characters"),
            });
        }

        let access_token_ttl = parse_ttl(
            &lookup,
            "ACCESS_TOKEN_TTL_MINUTES",
            15,
            MAX_ACCESS_TOKEN_TTL_MINUTES,
            Duration::try_minutes,
        )?;
        let refresh_token_ttl = parse_ttl(
            &lookup,
            "REFRESH_TOKEN_DAYS",
            7,
            MAX_REFRESH_TOKEN_DAYS,
            Duration::try_days,
        )?;
        let reset_token_ttl = parse_ttl(
            &lookup,
            "RESET_TOKEN_TTL_MINUTES",
            10,
            MAX_RESET_TOKEN_TTL_MINUTES,
            Duration::try_minutes,
        )?;

        let bcrypt_cost: u32 = parse_or(&lookup, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: "BCRYPT_COST",
                reason: format!("must be between {MIN_BCRYPT_COST} and 31"),
            });
        }

        let app_env = match lookup("APP_ENV") {
            Some(raw) => raw
                .parse()
                .map_err(|e: UnknownAppEnv| ConfigError::Invalid {
                    var: "APP_ENV",
                    reason: e.to_string(),
                })?,
            None => AppEnv::Development,
        };

        let public_url = lookup("PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:3001".into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            reset_token_ttl,
            bcrypt_cost,
            app_env,
            public_url,
        })
    }
}

/// SMTP relay credentials.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Mail transport settings. `smtp` is `None` when no credentials are set.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp: Option<SmtpSettings>,
    pub from: String,
    pub timeout: std::time::Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            from: "KTP Support <no-reply@localhost>".into(),
            timeout: std::time::Duration::from_secs(10),
        }
    }
}

impl MailConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let user = lookup("SMTP_USER").filter(|s| !s.is_empty());
        let pass = lookup("SMTP_PASS").filter(|s| !s.is_empty());
        let smtp = match (user, pass) {
            (Some(user), Some(pass)) => Some(SmtpSettings {
                host: lookup("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
                user,
                pass,
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "SMTP_USER",
                    reason: "SMTP_USER and SMTP_PASS must be set together".into(),
                });
            }
        };

        let from = lookup("MAIL_FROM").unwrap_or_else(|| match &smtp {
            Some(s) => format!("KTP Support <{}>", s.user),
            None => MailConfig::default().from,
        });

        let timeout_secs: u64 = parse_or(&lookup, "MAIL_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "MAIL_TIMEOUT_SECS",
                reason: "must be positive".into(),
            });
        }

        Ok(Self {
            smtp,
            from,
            timeout: std::time::Duration::from_secs(timeout_secs),
        })
    }
}

/// Parse `var` if present, else `default`. A present but unparsable value is
/// an error rather than a silent fallback.
pub fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// A lifetime in whole `unit`s, between 1 and `max` inclusive.
fn parse_ttl(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: i64,
    max: i64,
    unit: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    let value: i64 = parse_or(lookup, var, default)?;
    if !(1..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("must be between 1 and {max}"),
        });
    }
    unit(value).ok_or_else(|| ConfigError::Invalid {
        var,
        reason: "out of range".into(),
    })
}
