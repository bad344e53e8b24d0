//! Bearer credential verification.
//!
//! # Responsibilities
//! - Parse `Authorization: Bearer <token>` (scheme is case-insensitive)
//! - Verify the token signature against the configured RSA public key
//! - Check expiry and structure, then turn the `sub` claim into an [`Identity`]
//! - Attach the identity to the request for downstream stages
//!
//! # Design Decisions
//! - Accepted algorithms are pinned to RS256/RS384/RS512; a token declaring
//!   anything else (HS*, ES*, `none`) is rejected before any key is used
//! - Stateless: every request is verified independently, nothing is cached
//! - Callers only learn which of three coarse failures occurred

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::observability::metrics;

/// Verified subject of a caller's credential.
///
/// Lives only for the request that carried the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(Uuid);

impl Identity {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Handlers on protected routes take `Identity` as an argument.
///
/// Reaching a handler without one means the identity stage was not
/// composed in front of it, which is answered as unauthenticated.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or(AppError::Unauthorized(AuthError::MissingOrMalformedCredential))
    }
}

/// Why a credential was refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or malformed credential")]
    MissingOrMalformedCredential,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("invalid subject claim")]
    InvalidSubjectClaim,
}

impl AuthError {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingOrMalformedCredential => "missing_or_malformed",
            AuthError::InvalidCredential => "invalid_credential",
            AuthError::InvalidSubjectClaim => "invalid_subject",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<String>,
}

/// Verifies bearer tokens signed by the citizen identity provider.
pub struct IdentityVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityVerifier {
    /// Build a verifier from an RSA public key in PEM form.
    pub fn from_rsa_pem(pem: &[u8], leeway_secs: u64) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(pem)?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self { key, validation })
    }

    /// Verify a raw `Authorization` header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(AuthError::MissingOrMalformedCredential)?;

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => {
                    AuthError::InvalidSubjectClaim
                }
                kind => {
                    tracing::debug!(reason = ?kind, "Bearer token rejected");
                    AuthError::InvalidCredential
                }
            }
        })?;

        let subject = data.claims.sub.ok_or(AuthError::InvalidSubjectClaim)?;
        Uuid::parse_str(&subject)
            .map(Identity)
            .map_err(|_| AuthError::InvalidSubjectClaim)
    }
}

/// Extract the token from `Bearer <token>`; exactly one space-separated pair.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

/// Identity stage: verify the credential and attach the caller identity.
pub async fn identity_middleware(
    State(verifier): State<Arc<IdentityVerifier>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match verifier.verify(header) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(reason = e.kind(), path = %req.uri().path(), "Authentication failed");
            metrics::record_auth_failure(e.kind());
            AppError::Unauthorized(e).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER abc"), Some("abc"));
    }

    #[test]
    fn test_malformed_headers() {
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
        assert_eq!(bearer_token("Token abc"), None);
    }

    #[test]
    fn test_identity_displays_as_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(Identity::new(id).to_string(), id.to_string());
    }
}
