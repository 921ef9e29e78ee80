//! The authorization server engine.
//!
//! [`OidcServer`] owns the validated configuration and the external
//! collaborators (storage, signer, client source, connectors). The flow
//! operations live in sibling modules as `impl OidcServer` blocks.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Weak};

use crate::config::ServerConfig;
use crate::errors::{AuthorizeError, ConfigError, OAuthError};
use crate::oauth::clients::{ClientSource, ClientTrustResolver};
use crate::oauth::connectors::{Authenticator, Connector};
use crate::oauth::signer::Signer;
use crate::oauth::types::Identity;
use crate::storage::traits::OAuthStorage;
use async_trait::async_trait;

/// Source of the current time for every expiry decision.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct OidcServer {
    config: ServerConfig,
    pub(crate) storage: Arc<dyn OAuthStorage>,
    pub(crate) signer: Arc<dyn Signer>,
    pub(crate) clients: ClientTrustResolver,
    connectors: Vec<Arc<dyn Connector>>,
    clock: Clock,
}

impl OidcServer {
    /// Build the server and initialize every connector with its callback handle.
    pub async fn new(
        config: ServerConfig,
        storage: Arc<dyn OAuthStorage>,
        signer: Arc<dyn Signer>,
        client_source: Arc<dyn ClientSource>,
        connectors: Vec<Arc<dyn Connector>>,
    ) -> Result<Arc<Self>, ConfigError> {
        Self::with_clock(
            config,
            storage,
            signer,
            client_source,
            connectors,
            Arc::new(Utc::now),
        )
        .await
    }

    pub async fn with_clock(
        config: ServerConfig,
        storage: Arc<dyn OAuthStorage>,
        signer: Arc<dyn Signer>,
        client_source: Arc<dyn ClientSource>,
        connectors: Vec<Arc<dyn Connector>>,
        clock: Clock,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        let mut seen = HashSet::new();
        for connector in &connectors {
            if !seen.insert(connector.id().to_string()) {
                return Err(ConfigError::DuplicateConnector(connector.id().to_string()));
            }
        }

        let server = Arc::new(Self {
            config,
            storage,
            signer,
            clients: ClientTrustResolver::new(client_source),
            connectors,
            clock,
        });

        for connector in &server.connectors {
            let authenticator = Arc::new(ServerAuthenticator {
                server: Arc::downgrade(&server),
                connector_id: connector.id().to_string(),
            });
            connector
                .initialize(authenticator)
                .await
                .map_err(|e| ConfigError::ConnectorInitFailed(connector.id().to_string(), e.to_string()))?;
            tracing::info!(connector_id = %connector.id(), "connector initialized");
        }

        Ok(server)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// `now + validity`, failing instead of overflowing.
    pub(crate) fn expiry(
        &self,
        now: DateTime<Utc>,
        validity: chrono::Duration,
    ) -> Result<DateTime<Utc>, OAuthError> {
        now.checked_add_signed(validity)
            .ok_or_else(|| OAuthError::ServerError("expiration time out of range".to_string()))
    }

    pub fn connectors(&self) -> &[Arc<dyn Connector>] {
        &self.connectors
    }

    pub fn connector(&self, connector_id: &str) -> Option<&Arc<dyn Connector>> {
        self.connectors.iter().find(|c| c.id() == connector_id)
    }

    pub fn clients(&self) -> &ClientTrustResolver {
        &self.clients
    }

    /// Drop expired requests and codes. The flow never depends on this running.
    pub async fn cleanup_expired(&self) -> Result<(usize, usize), OAuthError> {
        let now = self.now();
        let requests = self
            .storage
            .cleanup_expired_authorization_requests(now)
            .await?;
        let codes = self.storage.cleanup_expired_codes(now).await?;
        Ok((requests, codes))
    }
}

/// Callback handle bound to one connector, holding the server weakly so
/// connectors do not keep it alive.
struct ServerAuthenticator {
    server: Weak<OidcServer>,
    connector_id: String,
}

#[async_trait]
impl Authenticator for ServerAuthenticator {
    async fn authenticate(
        &self,
        request_id: &str,
        identity: Identity,
    ) -> Result<String, AuthorizeError> {
        let server = self.server.upgrade().ok_or_else(|| {
            AuthorizeError::Direct(OAuthError::ServerError("server shut down".to_string()))
        })?;
        server.complete(&self.connector_id, request_id, identity).await
    }
}
