//! Pluggable authentication backends.
//!
//! A connector logs the end user in by whatever means it implements and
//! reports the resulting [`Identity`] back through the [`Authenticator`]
//! handle it was initialized with, correlated by the authorization request id.

pub mod mock;

pub use mock::MockConnector;

use crate::errors::{AuthorizeError, ConnectorError};
use crate::oauth::types::{AuthorizationRequest, Identity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// What the authorization endpoint does after handing a request to a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAction {
    /// Send the browser elsewhere, e.g. to an upstream provider or the next step of the flow.
    Redirect(String),
    /// Render a page owned by the connector, such as a password form.
    Html(String),
}

/// Callback handle given to connectors at initialization.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Attach `identity` to the pending request and return the URL the
    /// browser should visit next.
    async fn authenticate(
        &self,
        request_id: &str,
        identity: Identity,
    ) -> Result<String, AuthorizeError>;
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Pre-trusted connectors skip the approval step.
    fn trusted(&self) -> bool {
        false
    }

    /// Called exactly once at server construction.
    async fn initialize(&self, authenticator: Arc<dyn Authenticator>) -> Result<(), ConnectorError>;

    async fn login(&self, request: &AuthorizationRequest) -> Result<LoginAction, ConnectorError>;

    /// Handle a redirect back from an upstream provider on `/callback/{connector}`.
    async fn handle_callback(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<String, ConnectorError> {
        let _ = params;
        Err(ConnectorError::CallbackUnsupported(self.id().to_string()))
    }
}
