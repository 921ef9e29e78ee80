//! Handles POST /token - Exchanges authorization codes for signed tokens

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::context::AppState;
use super::utils_oauth::{extract_client_credentials, oauth_error_response};
use crate::errors::OAuthError;

/// Token request form (RFC 6749 Section 4.1.3)
#[derive(Debug, Default, Deserialize)]
pub struct TokenForm {
    pub grant_type: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// POST /token
pub async fn handle_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Response {
    let result = async {
        match form.grant_type.as_deref() {
            Some("authorization_code") => {}
            Some(other) => {
                return Err(OAuthError::UnsupportedGrantType(format!(
                    "grant type \"{}\" is not supported",
                    other
                )));
            }
            None => {
                return Err(OAuthError::InvalidRequest("missing grant_type".to_string()));
            }
        }

        let credentials = extract_client_credentials(
            &headers,
            form.client_id.as_deref(),
            form.client_secret.as_deref(),
        )?;

        state
            .server
            .exchange(
                form.code.as_deref().unwrap_or_default(),
                form.redirect_uri.as_deref(),
                &credentials,
            )
            .await
    }
    .await;

    let no_store = [
        (header::CACHE_CONTROL, "no-store"),
        (header::PRAGMA, "no-cache"),
    ];
    match result {
        Ok(tokens) => (no_store, Json(tokens)).into_response(),
        Err(error) => {
            tracing::info!(error = %error, "token request rejected");
            let mut response = oauth_error_response(&error);
            for (name, value) in no_store {
                response
                    .headers_mut()
                    .insert(name, http::HeaderValue::from_static(value));
            }
            response
        }
    }
}
