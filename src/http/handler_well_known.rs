//! Handles GET /.well-known/openid-configuration and GET /keys

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json, Response},
};

use super::context::AppState;
use super::utils_oauth::oauth_error_response;
use crate::errors::OAuthError;

/// OpenID Provider Configuration handler
/// GET /.well-known/openid-configuration
pub async fn openid_configuration_handler(State(state): State<AppState>) -> Response {
    match state.server.discovery().await {
        Ok(document) => Json(document).into_response(),
        Err(e) => oauth_error_response(&OAuthError::from(e)),
    }
}

/// JSON Web Key Set handler
/// GET /keys
pub async fn jwks_handler(State(state): State<AppState>) -> Response {
    match state.server.keys().await {
        Ok(jwks) => (
            [(header::CACHE_CONTROL, "max-age=3600, must-revalidate")],
            Json(jwks),
        )
            .into_response(),
        Err(e) => oauth_error_response(&OAuthError::from(e)),
    }
}
