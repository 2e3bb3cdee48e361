//! Access tokens.
//!
//! Users log in through the account service, which hands out HS256 JWTs signed with `BB_JWT_SECRET`. This server only
//! verifies them: [`TokenValidator`] checks the signature and expiry, and the resulting [`JwtClaims`] are placed in
//! the request extensions by the JWT middleware, where handlers pick them up as an extractor.
//!
//! [`TokenIssuer`] mints tokens with the same secret. It backs the `/api/admin/token` endpoint that support staff use
//! to act on behalf of a user, and the tests.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use boiboi_common::Secret;
use boiboi_engine::db_types::{UserId, UserRole};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: UserId,
    pub role: UserRole,
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(sub: UserId, role: UserRole, lifetime: Duration) -> Self {
        let exp = (Utc::now() + lifetime).timestamp();
        Self { sub, role, exp }
    }

    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ No JWT claims found in request extensions. Is the route wrapped in the JWT middleware?");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(secret: &Secret<String>) -> Self {
        let key = DecodingKey::from_secret(secret.reveal().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        trace!("🔐️ Access token validated for {}", data.claims.sub);
        Ok(data.claims)
    }
}

pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(secret: &Secret<String>) -> Self {
        Self { key: EncodingKey::from_secret(secret.reveal().as_bytes()) }
    }

    /// Issue a new access token for the given user. Callers must have established that the user holds `role`.
    pub fn issue_token(&self, user: UserId, role: UserRole, lifetime: Option<Duration>) -> Result<String, AuthError> {
        let lifetime = lifetime.unwrap_or_else(|| Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS));
        let claims = JwtClaims::new(user, role, lifetime);
        encode(&Header::new(Algorithm::HS256), &claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
