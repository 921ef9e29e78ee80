//! Storage trait definitions for authorization requests and codes.
//!
//! Every read takes `now` from the caller's clock: a record past its
//! expiration is reported as not found. Transitions that must happen at most
//! once are conditional and atomic, returning `None` when the condition no
//! longer holds.

use crate::errors::StorageError;
use crate::oauth::types::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for pending authorization requests
#[async_trait]
pub trait AuthorizationRequestStore {
    /// Persist a new request, failing with `AlreadyExists` on an id collision
    async fn create_authorization_request(&self, request: &AuthorizationRequest) -> Result<()>;

    async fn get_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>>;

    /// Attach an identity to a request that has none yet
    async fn attach_identity(
        &self,
        id: &str,
        identity: &Identity,
        approved: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>>;

    /// Mark an authenticated, not yet approved request as approved
    async fn approve_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>>;

    /// Remove and return a live request; only one caller ever receives it
    async fn consume_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>>;

    /// Clean up expired requests
    async fn cleanup_expired_authorization_requests(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Trait for storing and redeeming authorization codes
#[async_trait]
pub trait AuthorizationCodeStore {
    /// Store a new authorization code, failing with `AlreadyExists` on collision
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()>;

    /// Retrieve and consume an authorization code; only one caller ever receives it
    async fn consume_code(&self, code: &str, now: DateTime<Utc>)
    -> Result<Option<AuthorizationCode>>;

    /// Clean up expired codes
    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Combined storage used by the authorization server
pub trait OAuthStorage: AuthorizationRequestStore + AuthorizationCodeStore + Send + Sync {}
