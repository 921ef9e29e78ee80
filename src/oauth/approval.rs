//! User consent between authentication and token issuance.

use serde::Serialize;

use crate::errors::{AuthorizeError, OAuthError};
use crate::oauth::scopes::parse_stored_scopes;
use crate::oauth::server::OidcServer;

/// What the approval page shows the end user.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalPrompt {
    pub request_id: String,
    pub client_id: String,
    pub client_name: String,
    pub logo_url: Option<String>,
    pub username: String,
    pub scopes: Vec<String>,
}

impl OidcServer {
    pub async fn request_approval(&self, request_id: &str) -> Result<ApprovalPrompt, AuthorizeError> {
        let request = self
            .storage
            .get_authorization_request(request_id, self.now())
            .await
            .map_err(|e| AuthorizeError::Direct(e.into()))?
            .ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::InvalidRequest(
                    "authorization request not found or expired".to_string(),
                ))
            })?;

        let identity = request.identity.as_ref().ok_or_else(|| {
            AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request is not authenticated".to_string(),
            ))
        })?;

        let client = self
            .clients
            .resolve(&request.client_id)
            .await
            .map_err(|e| AuthorizeError::Direct(e.into()))?
            .ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::UnknownClient(request.client_id.clone()))
            })?;

        Ok(ApprovalPrompt {
            request_id: request.id.clone(),
            client_id: client.id.clone(),
            client_name: client.display_name().to_string(),
            logo_url: client.logo_url.clone(),
            username: identity.username.clone(),
            scopes: parse_stored_scopes(&request.scopes)
                .iter()
                .filter_map(|scope| scope.description())
                .collect(),
        })
    }

    /// Record the end user's decision. Approval finalizes the request; denial
    /// consumes it and redirects `access_denied` to the client.
    pub async fn decide(&self, request_id: &str, approved: bool) -> Result<String, AuthorizeError> {
        let now = self.now();
        let not_found = || {
            AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request not found or expired".to_string(),
            ))
        };

        let request = self
            .storage
            .get_authorization_request(request_id, now)
            .await
            .map_err(|e| AuthorizeError::Direct(e.into()))?
            .ok_or_else(not_found)?;

        if request.identity.is_none() {
            return Err(AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request is not authenticated".to_string(),
            )));
        }

        if !approved {
            let request = self
                .storage
                .consume_authorization_request(request_id, now)
                .await
                .map_err(|e| request.redirect_error(e.into()))?
                .ok_or_else(not_found)?;
            tracing::info!(request_id = %request.id, client_id = %request.client_id, "request denied");
            return Err(request.redirect_error(OAuthError::AccessDenied(
                "the user denied the request".to_string(),
            )));
        }

        self.storage
            .approve_authorization_request(request_id, now)
            .await
            .map_err(|e| request.redirect_error(e.into()))?
            .ok_or_else(not_found)?;

        self.finalize(request_id).await
    }
}
