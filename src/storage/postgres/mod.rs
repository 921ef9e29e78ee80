//! PostgreSQL storage implementations
//!
//! PostgreSQL is suitable for multi-instance deployments sharing one database.

mod authorization_codes;
mod authorization_requests;

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

pub use authorization_codes::PostgresAuthorizationCodeStore;
pub use authorization_requests::PostgresAuthorizationRequestStore;

/// PostgreSQL OAuth storage
pub struct PostgresOAuthStorage {
    pool: PgPool,
    authorization_request_store: PostgresAuthorizationRequestStore,
    authorization_code_store: PostgresAuthorizationCodeStore,
}

impl PostgresOAuthStorage {
    /// Create a new PostgreSQL OAuth storage instance
    pub fn new(pool: PgPool) -> Self {
        Self {
            authorization_request_store: PostgresAuthorizationRequestStore::new(pool.clone()),
            authorization_code_store: PostgresAuthorizationCodeStore::new(pool.clone()),
            pool,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::DatabaseError(format!("Migration failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl AuthorizationRequestStore for PostgresOAuthStorage {
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
impl AuthorizationCodeStore for PostgresOAuthStorage {
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

impl OAuthStorage for PostgresOAuthStorage {}
