//! Connector completion: attaching an authenticated identity to a pending request.

use std::collections::HashMap;

use crate::errors::{AuthorizeError, ConnectorError, OAuthError};
use crate::oauth::server::OidcServer;
use crate::oauth::types::Identity;

impl OidcServer {
    /// Attach `identity` to the request and return the URL the browser goes
    /// to next: the approval page, or the client when approval is skipped.
    pub async fn complete(
        &self,
        connector_id: &str,
        request_id: &str,
        identity: Identity,
    ) -> Result<String, AuthorizeError> {
        let now = self.now();
        let request = self
            .storage
            .get_authorization_request(request_id, now)
            .await
            .map_err(|e| AuthorizeError::Direct(e.into()))?
            .ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::InvalidRequest(
                    "authorization request not found or expired".to_string(),
                ))
            })?;

        if request.connector_id != connector_id {
            return Err(AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request belongs to another connector".to_string(),
            )));
        }
        if request.identity.is_some() {
            return Err(AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request is already authenticated".to_string(),
            )));
        }

        let skip_approval = self.config().skip_approval
            || self.connector(connector_id).is_some_and(|c| c.trusted());

        let request = self
            .storage
            .attach_identity(request_id, &identity, skip_approval, now)
            .await
            .map_err(|e| request.redirect_error(e.into()))?
            .ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::InvalidRequest(
                    "authorization request is already authenticated".to_string(),
                ))
            })?;

        tracing::debug!(
            request_id = %request.id,
            user_id = %identity.user_id,
            skip_approval,
            "identity attached"
        );

        if skip_approval {
            return self.finalize(request_id).await;
        }

        let mut approval = url::form_urlencoded::Serializer::new(String::new());
        approval.append_pair("req", request_id);
        Ok(self.config().abs_url(&format!("/approval?{}", approval.finish())))
    }

    /// Forward an upstream provider's redirect to the connector that started it.
    pub async fn callback(
        &self,
        connector_id: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, AuthorizeError> {
        let connector = self.connector(connector_id).ok_or_else(|| {
            AuthorizeError::Direct(OAuthError::UnknownConnector(connector_id.to_string()))
        })?;

        connector.handle_callback(params).await.map_err(|error| match error {
            ConnectorError::Flow(error) => error,
            ConnectorError::CallbackUnsupported(id) => AuthorizeError::Direct(
                OAuthError::InvalidRequest(format!("connector \"{}\" has no callback", id)),
            ),
            error => {
                tracing::error!(connector_id = %connector_id, error = ?error, "connector callback failed");
                AuthorizeError::Direct(OAuthError::ServerError(
                    "connector callback failed".to_string(),
                ))
            }
        })
    }
}
