//! Connector that authenticates a fixed identity without user interaction.

use super::{Authenticator, Connector, LoginAction};
use crate::errors::ConnectorError;
use crate::oauth::types::{AuthorizationRequest, Identity};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub const MOCK_CONNECTOR: &str = "mock";

pub struct MockConnector {
    id: String,
    display_name: String,
    identity: Identity,
    trusted: bool,
    authenticator: OnceLock<Arc<dyn Authenticator>>,
}

impl MockConnector {
    pub fn new(id: &str, identity: Identity) -> Self {
        Self {
            id: id.to_string(),
            display_name: "Mock".to_string(),
            identity,
            trusted: false,
            authenticator: OnceLock::new(),
        }
    }

    /// Mock connector with the development identity used by the binary.
    pub fn with_default_identity() -> Self {
        let mut claims = serde_json::Map::new();
        claims.insert(
            "preferred_username".to_string(),
            serde_json::Value::String("kilgore".to_string()),
        );
        Self::new(
            MOCK_CONNECTOR,
            Identity {
                user_id: "0-385-28089-0".to_string(),
                username: "Kilgore Trout".to_string(),
                email: Some("kilgore@kilgore.trout".to_string()),
                email_verified: true,
                groups: vec!["authors".to_string()],
                claims,
            },
        )
    }

    pub fn trusted(mut self, trusted: bool) -> Self {
        self.trusted = trusted;
        self
    }

    fn authenticator(&self) -> Result<&Arc<dyn Authenticator>, ConnectorError> {
        self.authenticator
            .get()
            .ok_or_else(|| ConnectorError::NotInitialized(self.id.clone()))
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn trusted(&self) -> bool {
        self.trusted
    }

    async fn initialize(&self, authenticator: Arc<dyn Authenticator>) -> Result<(), ConnectorError> {
        self.authenticator
            .set(authenticator)
            .map_err(|_| ConnectorError::AlreadyInitialized(self.id.clone()))
    }

    async fn login(&self, request: &AuthorizationRequest) -> Result<LoginAction, ConnectorError> {
        let next = self
            .authenticator()?
            .authenticate(&request.id, self.identity.clone())
            .await?;
        Ok(LoginAction::Redirect(next))
    }

    /// `?req=<id>` completes the request with the fixed identity, the same as a login.
    async fn handle_callback(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<String, ConnectorError> {
        let request_id = params
            .get("req")
            .ok_or_else(|| ConnectorError::LoginFailed("missing req parameter".to_string()))?;
        Ok(self
            .authenticator()?
            .authenticate(request_id, self.identity.clone())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AuthorizeError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAuthenticator {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Authenticator for RecordingAuthenticator {
        async fn authenticate(
            &self,
            request_id: &str,
            identity: Identity,
        ) -> Result<String, AuthorizeError> {
            self.calls
                .lock()
                .unwrap()
                .push((request_id.to_string(), identity.user_id));
            Ok(format!("https://idp.example/next/{}", request_id))
        }
    }

    #[tokio::test]
    async fn test_login_before_initialize_fails() {
        let connector = MockConnector::with_default_identity();
        let mut params = HashMap::new();
        params.insert("req".to_string(), "abc".to_string());
        assert!(matches!(
            connector.handle_callback(&params).await,
            Err(ConnectorError::NotInitialized(_))
        ));
    }

    #[tokio::test]
    async fn test_callback_reports_identity() {
        let connector = MockConnector::with_default_identity();
        let authenticator = Arc::new(RecordingAuthenticator::default());
        connector.initialize(authenticator.clone()).await.unwrap();
        assert!(matches!(
            connector.initialize(authenticator.clone()).await,
            Err(ConnectorError::AlreadyInitialized(_))
        ));

        let mut params = HashMap::new();
        params.insert("req".to_string(), "abc".to_string());
        let next = connector.handle_callback(&params).await.unwrap();
        assert_eq!(next, "https://idp.example/next/abc");
        assert_eq!(
            authenticator.calls.lock().unwrap().as_slice(),
            &[("abc".to_string(), "0-385-28089-0".to_string())]
        );
    }
}
