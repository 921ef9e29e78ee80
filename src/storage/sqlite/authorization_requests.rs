//! SQLite implementation for pending authorization requests

use crate::errors::StorageError;
use crate::oauth::types::*;
use crate::storage::traits::{AuthorizationRequestStore, Result};
use crate::storage::{decode_json, encode_json, map_insert_error};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteRow};
use sqlx::Row;

const COLUMNS: &str = "id, client_id, response_types, scopes, redirect_uri, state, nonce, \
    connector_id, identity, approved, created_at, expires_at";

/// SQLite implementation of authorization request storage
pub struct SqliteAuthorizationRequestStore {
    pool: SqlitePool,
}

impl SqliteAuthorizationRequestStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_authorization_request(row: &SqliteRow) -> Result<AuthorizationRequest> {
        let get_err = |column: &str, e: sqlx::Error| {
            StorageError::DatabaseError(format!("Failed to get {}: {}", column, e))
        };

        let response_types: String = row
            .try_get("response_types")
            .map_err(|e| get_err("response_types", e))?;
        let scopes: String = row.try_get("scopes").map_err(|e| get_err("scopes", e))?;
        let identity: Option<String> = row.try_get("identity").map_err(|e| get_err("identity", e))?;
        let approved: i64 = row.try_get("approved").map_err(|e| get_err("approved", e))?;

        let created_at_str: String = row
            .try_get("created_at")
            .map_err(|e| get_err("created_at", e))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| StorageError::InvalidData(format!("Invalid created_at timestamp: {}", e)))?
            .with_timezone(&Utc);
        let expires_at_ms: i64 = row
            .try_get("expires_at")
            .map_err(|e| get_err("expires_at", e))?;
        let expires_at = Utc
            .timestamp_millis_opt(expires_at_ms)
            .single()
            .ok_or_else(|| StorageError::InvalidData("Invalid expires_at timestamp".to_string()))?;

        Ok(AuthorizationRequest {
            id: row.try_get("id").map_err(|e| get_err("id", e))?,
            client_id: row.try_get("client_id").map_err(|e| get_err("client_id", e))?,
            response_types: decode_json(&response_types)?,
            scopes: decode_json(&scopes)?,
            redirect_uri: row
                .try_get("redirect_uri")
                .map_err(|e| get_err("redirect_uri", e))?,
            state: row.try_get("state").map_err(|e| get_err("state", e))?,
            nonce: row.try_get("nonce").map_err(|e| get_err("nonce", e))?,
            connector_id: row
                .try_get("connector_id")
                .map_err(|e| get_err("connector_id", e))?,
            identity: identity.as_deref().map(decode_json).transpose()?,
            approved: approved != 0,
            created_at,
            expires_at,
        })
    }

    async fn fetch_one_returning<'q>(
        &self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<Option<AuthorizationRequest>> {
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        row.as_ref().map(Self::row_to_authorization_request).transpose()
    }
}

#[async_trait]
impl AuthorizationRequestStore for SqliteAuthorizationRequestStore {
    async fn create_authorization_request(&self, request: &AuthorizationRequest) -> Result<()> {
        let identity = request.identity.as_ref().map(encode_json).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO authorization_requests (
                id, client_id, response_types, scopes, redirect_uri, state, nonce,
                connector_id, identity, approved, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.client_id)
        .bind(encode_json(&request.response_types)?)
        .bind(encode_json(&request.scopes)?)
        .bind(&request.redirect_uri)
        .bind(&request.state)
        .bind(&request.nonce)
        .bind(&request.connector_id)
        .bind(identity)
        .bind(request.approved as i64)
        .bind(request.created_at.to_rfc3339())
        .bind(request.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "authorization request"))?;

        Ok(())
    }

    async fn get_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let sql = format!(
            "SELECT {} FROM authorization_requests WHERE id = ? AND expires_at > ?",
            COLUMNS
        );
        self.fetch_one_returning(sqlx::query(&sql).bind(id).bind(now.timestamp_millis()))
            .await
    }

    async fn attach_identity(
        &self,
        id: &str,
        identity: &Identity,
        approved: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let sql = format!(
            "UPDATE authorization_requests SET identity = ?, approved = ? \
             WHERE id = ? AND identity IS NULL AND expires_at > ? RETURNING {}",
            COLUMNS
        );
        self.fetch_one_returning(
            sqlx::query(&sql)
                .bind(encode_json(identity)?)
                .bind(approved as i64)
                .bind(id)
                .bind(now.timestamp_millis()),
        )
        .await
    }

    async fn approve_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let sql = format!(
            "UPDATE authorization_requests SET approved = 1 \
             WHERE id = ? AND identity IS NOT NULL AND approved = 0 AND expires_at > ? \
             RETURNING {}",
            COLUMNS
        );
        self.fetch_one_returning(sqlx::query(&sql).bind(id).bind(now.timestamp_millis()))
            .await
    }

    async fn consume_authorization_request(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationRequest>> {
        let sql = format!(
            "DELETE FROM authorization_requests WHERE id = ? AND expires_at > ? RETURNING {}",
            COLUMNS
        );
        self.fetch_one_returning(sqlx::query(&sql).bind(id).bind(now.timestamp_millis()))
            .await
    }

    async fn cleanup_expired_authorization_requests(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM authorization_requests WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;
        Ok(result.rows_affected() as usize)
    }
}
