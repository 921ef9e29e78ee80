//! Shared response helpers for OAuth endpoints.

use axum::{
    Json,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_template::TemplateEngine;
use base64::prelude::*;
use serde_json::json;

use super::context::AppState;
use crate::errors::{AuthorizeError, OAuthError};
use crate::oauth::ClientCredentials;
use crate::oauth::types::OAuthErrorResponse;

/// JSON OAuth error object with the status matching the error kind.
pub(crate) fn oauth_error_response(error: &OAuthError) -> Response {
    (error.status_code(), Json(OAuthErrorResponse::from(error))).into_response()
}

/// Render an authorization endpoint failure: redirect to the client when
/// the redirect URI is trusted, otherwise show the error page.
pub(crate) fn authorize_error_response(state: &AppState, error: AuthorizeError) -> Response {
    if let Some(location) = error.redirect_url() {
        tracing::debug!(error = %error, "redirecting error to client");
        return Redirect::to(&location).into_response();
    }
    render_error(state, error.oauth_error())
}

/// Error page for errors that must not be sent to a redirect URI.
pub(crate) fn render_error(state: &AppState, error: &OAuthError) -> Response {
    if matches!(error, OAuthError::ServerError(_)) {
        tracing::error!(error = %error, "authorization flow failed");
    } else {
        tracing::info!(error = %error, "authorization request rejected");
    }

    let status = match error.status_code() {
        StatusCode::INTERNAL_SERVER_ERROR => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    };
    let context = json!({
        "error": error.error_code(),
        "error_description": error.description(),
    });

    match state.template_env.render("error.html", context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "failed to render error page");
            (status, error.description().to_string()).into_response()
        }
    }
}

/// Client credentials from HTTP Basic authentication (RFC 6749 Section
/// 2.3.1), falling back to `client_id` / `client_secret` form parameters.
pub(crate) fn extract_client_credentials(
    headers: &HeaderMap,
    form_client_id: Option<&str>,
    form_client_secret: Option<&str>,
) -> Result<ClientCredentials, OAuthError> {
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        let invalid = || OAuthError::InvalidClient("malformed basic credentials".to_string());
        let auth_str = auth_header.to_str().map_err(|_| invalid())?;
        if let Some(encoded) = auth_str.strip_prefix("Basic ") {
            let decoded = BASE64_STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
            let credentials = String::from_utf8(decoded).map_err(|_| invalid())?;
            let (client_id, client_secret) = credentials.split_once(':').ok_or_else(invalid)?;
            return Ok(ClientCredentials {
                client_id: form_decode(client_id),
                client_secret: Some(form_decode(client_secret)),
            });
        }
    }

    Ok(ClientCredentials {
        client_id: form_client_id.unwrap_or_default().to_string(),
        client_secret: form_client_secret
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

/// Basic credentials are form-urlencoded before base64 encoding.
fn form_decode(value: &str) -> String {
    url::form_urlencoded::parse(format!("v={}", value).as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_credentials_are_form_decoded() {
        let mut headers = HeaderMap::new();
        let encoded = BASE64_STANDARD.encode("my%20app:s%3Ac+ret");
        headers.insert(
            http::header::AUTHORIZATION,
            format!("Basic {}", encoded).parse().unwrap(),
        );

        let credentials = extract_client_credentials(&headers, Some("ignored"), None).unwrap();
        assert_eq!(credentials.client_id, "my app");
        assert_eq!(credentials.client_secret.as_deref(), Some("s:c ret"));
    }

    #[test]
    fn test_form_credentials_fallback() {
        let credentials =
            extract_client_credentials(&HeaderMap::new(), Some("app"), Some("secret")).unwrap();
        assert_eq!(credentials.client_id, "app");
        assert_eq!(credentials.client_secret.as_deref(), Some("secret"));

        let credentials = extract_client_credentials(&HeaderMap::new(), Some("cli"), Some(""))
            .unwrap();
        assert!(credentials.client_secret.is_none());
    }

    #[test]
    fn test_malformed_basic_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Basic !!!".parse().unwrap());
        assert!(matches!(
            extract_client_credentials(&headers, None, None),
            Err(OAuthError::InvalidClient(_))
        ));
    }
}
