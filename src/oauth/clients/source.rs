//! Client directory contract and a static, file backed implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::Client;
use crate::errors::ClientError;

/// Resolves client registrations. `Ok(None)` means the client is unknown.
#[async_trait]
pub trait ClientSource: Send + Sync {
    async fn get_client(&self, client_id: &str) -> Result<Option<Client>, ClientError>;
}

/// Client directory loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticClientSource {
    clients: HashMap<String, Client>,
}

impl StaticClientSource {
    pub fn new(clients: Vec<Client>) -> Result<Self, ClientError> {
        let mut by_id = HashMap::with_capacity(clients.len());
        for client in clients {
            if client.id.is_empty() {
                return Err(ClientError::InvalidClientMetadata(
                    "client id must not be empty".to_string(),
                ));
            }
            if !client.public && client.secret.as_deref().unwrap_or_default().is_empty() {
                return Err(ClientError::InvalidClientMetadata(format!(
                    "confidential client {} has no secret",
                    client.id
                )));
            }
            if by_id.contains_key(&client.id) {
                return Err(ClientError::InvalidClientMetadata(format!(
                    "duplicate client id {}",
                    client.id
                )));
            }
            by_id.insert(client.id.clone(), client);
        }
        Ok(Self { clients: by_id })
    }

    /// Parse a JSON array of clients.
    pub fn from_json(value: &str) -> Result<Self, ClientError> {
        let clients: Vec<Client> = serde_json::from_str(value)
            .map_err(|e| ClientError::InvalidClientMetadata(e.to_string()))?;
        Self::new(clients)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::SourceFailed(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientSource for StaticClientSource {
    async fn get_client(&self, client_id: &str) -> Result<Option<Client>, ClientError> {
        Ok(self.clients.get(client_id).cloned())
    }
}
