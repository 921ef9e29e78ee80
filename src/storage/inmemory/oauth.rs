//! In-memory OAuth storage implementation

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation for OAuth storage
#[derive(Default)]
pub struct MemoryOAuthStorage {
    auth_requests: Mutex<HashMap<String, AuthorizationRequest>>,
    auth_codes: Mutex<HashMap<String, AuthorizationCode>>,
}

impl MemoryOAuthStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn requests(&self) -> Result<MutexGuard<'_, HashMap<String, AuthorizationRequest>>> {
        self.auth_requests
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    fn codes(&self) -> Result<MutexGuard<'_, HashMap<String, AuthorizationCode>>> {
        self.auth_codes
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }
}

/// Live request under the lock, dropping it when it has expired.
fn live_request<'a>(
    requests: &'a mut HashMap<String, AuthorizationRequest>,
    id: &str,
    now: DateTime<Utc>,
) -> Option<&'a mut AuthorizationRequest> {
    if requests.get(id).is_some_and(|r| r.is_expired(now)) {
        requests.remove(id);
        return None;
    }
    requests.get_mut(id)
}

#[async_trait]
impl AuthorizationRequestStore for MemoryOAuthStorage {
    async fn create_authorization_request(&self, request: &AuthorizationRequest) -> Result<()> {
        let mut requests = self.requests()?;
        match requests.entry(request.id.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(format!(
                "authorization request {}",
                request.id
            ))),
            Entry::Vacant(entry) => {
                entry.insert(request.clone());
                Ok(())
            }
        }
    }

    async fn get_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let mut requests = self.requests()?;
        Ok(live_request(&mut requests, id, now).map(|r| r.clone()))
    }

    async fn attach_identity(
        &self,
        id: &str,
        identity: &Identity,
        approved: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let mut requests = self.requests()?;
        match live_request(&mut requests, id, now) {
            Some(request) if request.identity.is_none() => {
                request.identity = Some(identity.clone());
                request.approved = approved;
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn approve_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let mut requests = self.requests()?;
        match live_request(&mut requests, id, now) {
            Some(request) if request.identity.is_some() && !request.approved => {
                request.approved = true;
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn consume_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let mut requests = self.requests()?;
        Ok(requests.remove(id).filter(|r| !r.is_expired(now)))
    }

    async fn cleanup_expired_authorization_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut requests = self.requests()?;
        let before = requests.len();
        requests.retain(|_, r| !r.is_expired(now));
        Ok(before - requests.len())
    }
}

#[async_trait]
impl AuthorizationCodeStore for MemoryOAuthStorage {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        let mut codes = self.codes()?;
        match codes.entry(code.code.clone()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(
                "authorization code".to_string(),
            )),
            Entry::Vacant(entry) => {
                entry.insert(code.clone());
                Ok(())
            }
        }
    }

    async fn consume_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationCode>> {
        let mut codes = self.codes()?;
        Ok(codes.remove(code).filter(|c| !c.is_expired(now)))
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut codes = self.codes()?;
        let before = codes.len();
        codes.retain(|_, c| !c.is_expired(now));
        Ok(before - codes.len())
    }
}

impl OAuthStorage for MemoryOAuthStorage {}
