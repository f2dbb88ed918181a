//! Bearer-token authentication and role checks.
//!
//! Tokens are HS256 JWTs carrying `sub`, `roles` and `exp`. Every
//! authenticated caller holds `ROLE_USER`; writes additionally require
//! `ROLE_ADMIN`.

use crate::api::ApiError;
use crate::resource::{Resource, WriteAction};
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const ROLE_USER: &str = "ROLE_USER";
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user's email.
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct Authenticator {
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: &str) -> Self {
        Authenticator {
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Issue a token for `subject` holding `roles`, valid for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` if signing fails.
    pub fn issue(&self, subject: &str, roles: &[&str], ttl: Duration) -> crate::Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: now + ttl.as_secs(),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Check signature and expiry of `token`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` for a malformed, forged or expired token.
    pub fn verify(&self, token: &str) -> crate::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }
}

/// The authenticated caller of a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub subject: String,
    /// Sorted, de-duplicated, always containing `ROLE_USER`.
    pub roles: Vec<String>,
}

impl Caller {
    pub fn from_claims(claims: Claims) -> Self {
        let mut roles = claims.roles;
        roles.push(ROLE_USER.to_string());
        roles.sort();
        roles.dedup();
        Caller {
            subject: claims.sub,
            roles,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ROLE_ADMIN)
    }

    /// # Errors
    ///
    /// Returns `ApiError::Forbidden` with the action's message unless the
    /// caller holds `ROLE_ADMIN`.
    pub fn require_admin(&self, resource: Resource, action: WriteAction) -> Result<(), ApiError> {
        if self.is_admin() {
            return Ok(());
        }
        warn!(
            "{} denied {:?} on {}",
            self.subject,
            action,
            resource.segment()
        );
        Err(ApiError::Forbidden(resource.forbidden_message(action)))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    Authenticator: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = Authenticator::from_ref(state).verify(token).map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ApiError::Unauthorized("Invalid or expired token".to_string())
        })?;

        Ok(Caller::from_claims(claims))
    }
}
