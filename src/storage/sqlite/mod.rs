//! SQLite storage implementations
//!
//! SQLite is suitable for single-instance deployments and development.

mod authorization_codes;
mod authorization_requests;

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

pub use authorization_codes::SqliteAuthorizationCodeStore;
pub use authorization_requests::SqliteAuthorizationRequestStore;

/// SQLite OAuth storage
pub struct SqliteOAuthStorage {
    pool: SqlitePool,
    authorization_request_store: SqliteAuthorizationRequestStore,
    authorization_code_store: SqliteAuthorizationCodeStore,
}

impl SqliteOAuthStorage {
    /// Create a new SQLite OAuth storage instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            authorization_request_store: SqliteAuthorizationRequestStore::new(pool.clone()),
            authorization_code_store: SqliteAuthorizationCodeStore::new(pool.clone()),
            pool,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl AuthorizationRequestStore for SqliteOAuthStorage {
    async fn create_authorization_request(&self, request: &AuthorizationRequest) -> Result<()> {
        self.authorization_request_store
            .create_authorization_request(request)
            .await
    }

    async fn get_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        self.authorization_request_store
            .get_authorization_request(id, now)
            .await
    }

    async fn attach_identity(
        &self,
        id: &str,
        identity: &Identity,
        approved: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        self.authorization_request_store
            .attach_identity(id, identity, approved, now)
            .await
    }

    async fn approve_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        self.authorization_request_store
            .approve_authorization_request(id, now)
            .await
    }

    async fn consume_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        self.authorization_request_store
            .consume_authorization_request(id, now)
            .await
    }

    async fn cleanup_expired_authorization_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        self.authorization_request_store
            .cleanup_expired_authorization_requests(now)
            .await
    }
}

#[async_trait]
impl AuthorizationCodeStore for SqliteOAuthStorage {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        self.authorization_code_store.store_code(code).await
    }

    async fn consume_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationCode>> {
        self.authorization_code_store.consume_code(code, now).await
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        self.authorization_code_store.cleanup_expired_codes(now).await
    }
}

impl OAuthStorage for SqliteOAuthStorage {}
