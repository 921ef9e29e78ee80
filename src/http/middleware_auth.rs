//! Bearer token extraction for the user-info endpoint (RFC 6750 Section 2.1).

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use super::utils_oauth::oauth_error_response;
use crate::errors::OAuthError;

/// Access token presented as `Authorization: Bearer <token>`.
///
/// Rejects with `401 invalid_token` and a `WWW-Authenticate: Bearer` challenge
/// when the header is missing or uses another scheme. The token itself is
/// validated by the handler.
#[derive(Clone, Debug)]
pub struct ExtractedBearer(pub String);

impl<S> FromRequestParts<S> for ExtractedBearer
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                bearer_challenge(OAuthError::InvalidToken(
                    "missing Authorization header".to_string(),
                ))
            })?;

        // Split only on the first space; the scheme is case-insensitive.
        let (scheme, token) = auth_header.split_once(' ').ok_or_else(|| {
            bearer_challenge(OAuthError::InvalidToken(
                "malformed Authorization header".to_string(),
            ))
        })?;
        if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
            return Err(bearer_challenge(OAuthError::InvalidToken(
                "expected a bearer token".to_string(),
            )));
        }

        Ok(ExtractedBearer(token.trim().to_string()))
    }
}

/// OAuth error response with a `WWW-Authenticate: Bearer` challenge.
pub(crate) fn bearer_challenge(error: OAuthError) -> Response {
    let challenge = format!(
        "Bearer error=\"{}\", error_description=\"{}\"",
        error.error_code(),
        error.description().replace('"', "'")
    );
    let mut response = oauth_error_response(&error);
    if response.status() == StatusCode::UNAUTHORIZED {
        if let Ok(value) = http::HeaderValue::from_str(&challenge) {
            response
                .headers_mut()
                .insert(http::header::WWW_AUTHENTICATE, value);
        }
    }
    response.into_response()
}
