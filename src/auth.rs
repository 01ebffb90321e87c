use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{errors::AppError, state::AppState};

pub type SubjectId = i64;

/// The single failure outcome of authentication. Why it failed is logged,
/// never returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not authenticated")]
pub struct Unauthenticated;

impl From<Unauthenticated> for AppError {
    fn from(_: Unauthenticated) -> Self {
        AppError::Unauthorized("Invalid or expired token".into())
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolves a raw `Authorization` header value to the caller's id.
    async fn authenticate(&self, header_value: &str) -> Result<SubjectId, Unauthenticated>;
}

/// Delegates token verification to the identity authority.
///
/// Exactly one bounded call per request: no cache, no retry, so a revoked
/// token is refused as soon as the authority says so. Timeouts count as a
/// rejection.
pub struct TokenDelegate {
    client: reqwest::Client,
    validate_url: String,
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    valid: bool,
    #[serde(default, rename = "subjectId", alias = "userId")]
    subject_id: Option<SubjectId>,
}

impl TokenDelegate {
    /// `authority_url` is the base the `/validate` path is appended to.
    pub fn new(authority_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::EnvError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            validate_url: format!("{}/validate", authority_url.trim_end_matches('/')),
        })
    }
}

/// Strips the `Bearer` scheme if present. A bare token is accepted as is.
pub fn strip_bearer(header_value: &str) -> Option<&str> {
    let value = header_value.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if value.eq_ignore_ascii_case("bearer") => "",
        _ => value,
    };

    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl Authenticator for TokenDelegate {
    async fn authenticate(&self, header_value: &str) -> Result<SubjectId, Unauthenticated> {
        let Some(token) = strip_bearer(header_value) else {
            tracing::debug!("Rejecting request with empty bearer token");
            return Err(Unauthenticated);
        };

        let res = self
            .client
            .get(&self.validate_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!("Identity authority timed out: {}", e);
                } else {
                    tracing::error!("Failed to validate token with identity authority: {}", e);
                }
                Unauthenticated
            })?;

        if !res.status().is_success() {
            tracing::warn!("Identity authority responded with {}", res.status());
            return Err(Unauthenticated);
        }

        let body: IntrospectionResponse = res.json().await.map_err(|e| {
            tracing::warn!("Malformed introspection response: {}", e);
            Unauthenticated
        })?;

        match body {
            IntrospectionResponse {
                valid: true,
                subject_id: Some(subject_id),
            } => Ok(subject_id),
            IntrospectionResponse { valid: true, .. } => {
                tracing::warn!("Introspection marked token valid without a subject id");
                Err(Unauthenticated)
            }
            IntrospectionResponse { valid: false, .. } => {
                tracing::debug!("Identity authority rejected token");
                Err(Unauthenticated)
            }
        }
    }
}

/// Authenticated caller, resolved through the configured [`Authenticator`].
pub struct AuthUser(pub SubjectId);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized("Missing or invalid Authorization header".into())
                    .to_response()
            })?;

        state
            .authenticator
            .authenticate(header_value)
            .await
            .map(AuthUser)
            .map_err(|e| AppError::from(e).to_response())
    }
}
