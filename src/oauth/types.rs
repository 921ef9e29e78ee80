//! Core OAuth 2.0 / OpenID Connect types shared by the authorization flow.
//!
//! Defines response types, end-user identities, pending authorization
//! requests, authorization codes and token responses.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::errors::{AuthorizeError, OAuthError};

/// OAuth 2.0 / OpenID Connect response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Code,
    Token,
    IdToken,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Code => "code",
            ResponseType::Token => "token",
            ResponseType::IdToken => "id_token",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = OAuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "code" => Ok(ResponseType::Code),
            "token" => Ok(ResponseType::Token),
            "id_token" => Ok(ResponseType::IdToken),
            other => Err(OAuthError::UnsupportedResponseType(format!(
                "unknown response type \"{}\"",
                other
            ))),
        }
    }
}

/// OAuth 2.0 token types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Bearer,
}

/// An authenticated end user as reported by a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Identity {
    /// Stable subject identifier within the connector
    pub user_id: String,
    /// Display name
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Connector specific claims released with the `profile` scope
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// A pending authorization request, persisted between the browser legs of the flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    pub id: String,
    pub client_id: String,
    pub response_types: Vec<ResponseType>,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub nonce: Option<String>,
    pub connector_id: String,
    /// Attached exactly once when the connector completes
    pub identity: Option<Identity>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn wants(&self, response_type: ResponseType) -> bool {
        self.response_types.contains(&response_type)
    }

    /// Implicit and hybrid responses travel in the URL fragment.
    pub fn uses_fragment(&self) -> bool {
        self.wants(ResponseType::Token) || self.wants(ResponseType::IdToken)
    }

    /// `error` sent back to the client's redirect URI with this request's `state`.
    pub fn redirect_error(&self, error: OAuthError) -> AuthorizeError {
        AuthorizeError::redirect(
            &self.redirect_uri,
            self.state.as_deref(),
            self.uses_fragment(),
            error,
        )
    }
}

/// A single-use authorization code bound to a snapshot of the finalized request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub nonce: Option<String>,
    pub scopes: Vec<String>,
    pub audience: Vec<String>,
    pub identity: Identity,
    pub connector_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: TokenType,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// OAuth error object returned by the token and user-info endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl From<&OAuthError> for OAuthErrorResponse {
    fn from(err: &OAuthError) -> Self {
        Self {
            error: err.error_code().to_string(),
            error_description: Some(err.description().to_string()),
        }
    }
}

/// Generate a secure random token
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Append parameters to a redirect URI, either in the query or in the fragment.
pub fn append_params(
    redirect_uri: &str,
    params: &[(&str, String)],
    fragment: bool,
) -> Result<String, OAuthError> {
    let mut url = Url::parse(redirect_uri)
        .map_err(|e| OAuthError::InvalidRedirectUri(format!("{}: {}", redirect_uri, e)))?;

    if fragment {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            serializer.append_pair(key, value);
        }
        url.set_fragment(Some(&serializer.finish()));
    } else {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }

    Ok(url.to_string())
}
