//! Authorization endpoint: request validation and connector dispatch.

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::errors::{AuthorizeError, ConnectorError, OAuthError};
use crate::oauth::clients::OOB_REDIRECT_URI;
use crate::oauth::connectors::LoginAction;
use crate::oauth::scopes::{parse_scopes, scope_strings};
use crate::oauth::server::OidcServer;
use crate::oauth::types::{AuthorizationRequest, ResponseType, generate_token};

/// Authorization request parameters (RFC 6749 Section 4.1.1, OIDC Core 3.1.2.1)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeQuery {
    pub client_id: Option<String>,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
}

impl OidcServer {
    /// Validate and persist a new authorization request.
    ///
    /// Errors before the redirect URI is trusted are returned directly;
    /// later ones are redirected to the client with `state`.
    pub async fn begin(
        &self,
        connector_id: &str,
        query: &AuthorizeQuery,
    ) -> Result<AuthorizationRequest, AuthorizeError> {
        if self.connector(connector_id).is_none() {
            return Err(AuthorizeError::Direct(OAuthError::UnknownConnector(
                connector_id.to_string(),
            )));
        }

        let client_id = query.client_id.as_deref().unwrap_or_default();
        let client = self
            .clients
            .resolve(client_id)
            .await
            .map_err(|e| AuthorizeError::Direct(e.into()))?
            .ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::UnknownClient(format!(
                    "client \"{}\" is not registered",
                    client_id
                )))
            })?;

        let redirect_uri = query.redirect_uri.as_deref().unwrap_or_default();
        if redirect_uri.is_empty() || !self.clients.validate_redirect_uri(&client, redirect_uri) {
            return Err(AuthorizeError::Direct(OAuthError::InvalidRedirectUri(format!(
                "unregistered redirect_uri \"{}\"",
                redirect_uri
            ))));
        }

        // The redirect URI is trusted from here on.
        let raw_response_type = query.response_type.as_deref().unwrap_or_default();
        let fragment = raw_response_type
            .split_whitespace()
            .any(|rt| rt == "token" || rt == "id_token");
        let state = query.state.as_deref();
        let redirect_error =
            |error: OAuthError| AuthorizeError::redirect(redirect_uri, state, fragment, error);

        let mut response_types = BTreeSet::new();
        for value in raw_response_type.split_whitespace() {
            let response_type: ResponseType = value.parse().map_err(redirect_error)?;
            if !self.config().supported_response_types.contains(&response_type) {
                return Err(redirect_error(OAuthError::UnsupportedResponseType(format!(
                    "response type \"{}\" is not supported",
                    response_type
                ))));
            }
            response_types.insert(response_type);
        }
        if response_types.is_empty() {
            return Err(redirect_error(OAuthError::UnsupportedResponseType(
                "no response_type provided".to_string(),
            )));
        }
        let response_types: Vec<ResponseType> = response_types.into_iter().collect();
        let wants_code = response_types.contains(&ResponseType::Code);

        if redirect_uri == OOB_REDIRECT_URI && response_types != [ResponseType::Code] {
            return Err(AuthorizeError::Direct(OAuthError::InvalidRequest(
                "the out-of-band redirect URI only supports response_type \"code\"".to_string(),
            )));
        }

        let nonce = query.nonce.clone().filter(|n| !n.is_empty());
        if !wants_code && nonce.is_none() {
            return Err(redirect_error(OAuthError::InvalidRequest(
                "implicit flow requires a nonce".to_string(),
            )));
        }

        let scopes = parse_scopes(query.scope.as_deref().unwrap_or_default())
            .map_err(redirect_error)?;

        let now = self.now();
        let expires_at = self
            .expiry(now, self.config().auth_requests_valid_for)
            .map_err(redirect_error)?;
        let request = AuthorizationRequest {
            id: generate_token(),
            client_id: client.id.clone(),
            response_types,
            scopes: scope_strings(&scopes),
            redirect_uri: redirect_uri.to_string(),
            state: query.state.clone(),
            nonce,
            connector_id: connector_id.to_string(),
            identity: None,
            approved: false,
            created_at: now,
            expires_at,
        };

        self.storage
            .create_authorization_request(&request)
            .await
            .map_err(|e| request.redirect_error(e.into()))?;

        tracing::debug!(
            request_id = %request.id,
            client_id = %request.client_id,
            connector_id = %connector_id,
            "authorization request created"
        );

        Ok(request)
    }

    /// Begin a request and hand it to its connector.
    pub async fn authorize(
        &self,
        connector_id: &str,
        query: &AuthorizeQuery,
    ) -> Result<LoginAction, AuthorizeError> {
        let request = self.begin(connector_id, query).await?;
        let connector = self.connector(connector_id).ok_or_else(|| {
            AuthorizeError::Direct(OAuthError::UnknownConnector(connector_id.to_string()))
        })?;

        match connector.login(&request).await {
            Ok(action) => Ok(action),
            Err(ConnectorError::Flow(error)) => Err(error),
            Err(error) => {
                tracing::error!(connector_id = %connector_id, error = ?error, "connector login failed");
                Err(request.redirect_error(OAuthError::ServerError(
                    "connector login failed".to_string(),
                )))
            }
        }
    }
}
