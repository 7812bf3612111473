//! User domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Authorization role. Serialized lower-case (`"user"`, `"moderator"`, `"admin"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Avatar reference owned by the profile/upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
    pub url: String,
    pub storage_id: String,
}

/// Public view of a user. Carries no secret material and is safe to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<Avatar>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored user row, including the password hash and any pending reset.
///
/// Deliberately not `Serialize`: nothing holding a hash should reach a
/// response body or a log line.
#[derive(Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("user", &self.user)
            .field("password_hash", &"<redacted>")
            .field("reset_pending", &self.reset_token_hash.is_some())
            .field("reset_expires_at", &self.reset_expires_at)
            .finish()
    }
}

/// Input for creating a user row. `email` must already be normalized.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial profile update. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Per-role user counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCounts {
    pub total: u64,
    pub admins: u64,
    pub moderators: u64,
    pub users: u64,
}

/// Trim and lower-case an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose shape check: `local@domain.tld`, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[test]
    fn plausible_email_accepts_common_shapes() {
        assert!(is_plausible_email("a@x.com"));
        assert!(is_plausible_email("first.last@sub.example.org"));
    }

    #[test]
    fn plausible_email_rejects_garbage() {
        assert!(!is_plausible_email("no-at-sign"));
        assert!(!is_plausible_email("@x.com"));
        assert!(!is_plausible_email("a@nodot"));
        assert!(!is_plausible_email("a@b@c.com"));
        assert!(!is_plausible_email("a b@x.com"));
        assert!(!is_plausible_email("a@x.c"));
    }

    #[test]
    fn role_parses_and_serializes_lowercase() {
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        let err = "root".parse::<Role>().unwrap_err();
        assert_eq!(err, UnknownRole("root".into()));
        assert_eq!(err.to_string(), "unknown role 'root'");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert_eq!(boxed.to_string(), "unknown role 'root'");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn record_debug_redacts_hash() {
        let now = Utc::now();
        let record = UserRecord {
            user: User {
                id: Uuid::new_v4(),
                name: "A".into(),
                email: "a@x.com".into(),
                role: Role::User,
                avatar: None,
                created_at: now,
                updated_at: now,
            },
            password_hash: "$2b$12$secretsecret".into(),
            reset_token_hash: Some("deadbeef".into()),
            reset_expires_at: None,
        };
        let dbg = format!("{record:?}");
        assert!(!dbg.contains("secretsecret"));
        assert!(!dbg.contains("deadbeef"));
    }
}
