//! JWT access-token signing and verification.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use super::AuthError;
use super::tokens::expiry_after;
use crate::clock::Clock;
use crate::models::auth::TokenClaims;

/// Issues and verifies short-lived HS256 access tokens.
///
/// Expiry is judged against the injected [`Clock`], so `jsonwebtoken`'s own
/// wall-clock check is switched off.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
            clock,
        }
    }

    /// Sign a token whose subject is `user_id`.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            exp: expiry_after(now, self.ttl)?.timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature and expiry, returning the subject.
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|_| AuthError::TokenInvalid)?
            .claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(AuthError::TokenExpired);
        }
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::TokenInvalid)
    }
}
