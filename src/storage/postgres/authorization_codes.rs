//! PostgreSQL implementation for authorization code storage

use crate::errors::StorageError;
use crate::oauth::types::AuthorizationCode;
use crate::storage::traits::{AuthorizationCodeStore, Result};
use crate::storage::{decode_json, encode_json, map_insert_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

/// PostgreSQL implementation of authorization code storage
pub struct PostgresAuthorizationCodeStore {
    pool: PgPool,
}

impl PostgresAuthorizationCodeStore {
    /// Create a new PostgreSQL authorization code store
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert PostgreSQL row to AuthorizationCode
    fn row_to_authorization_code(row: &PgRow) -> Result<AuthorizationCode> {
        let get_err = |column: &str, e: sqlx::Error| {
            StorageError::DatabaseError(format!("Failed to get {}: {}", column, e))
        };

        let scopes: String = row.try_get("scopes").map_err(|e| get_err("scopes", e))?;
        let audience: String = row.try_get("audience").map_err(|e| get_err("audience", e))?;
        let identity: String = row.try_get("identity").map_err(|e| get_err("identity", e))?;

        Ok(AuthorizationCode {
            code: row.try_get("code").map_err(|e| get_err("code", e))?,
            client_id: row.try_get("client_id").map_err(|e| get_err("client_id", e))?,
            redirect_uri: row
                .try_get("redirect_uri")
                .map_err(|e| get_err("redirect_uri", e))?,
            nonce: row.try_get("nonce").map_err(|e| get_err("nonce", e))?,
            scopes: decode_json(&scopes)?,
            audience: decode_json(&audience)?,
            identity: decode_json(&identity)?,
            connector_id: row
                .try_get("connector_id")
                .map_err(|e| get_err("connector_id", e))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| get_err("created_at", e))?,
            expires_at: row
                .try_get("expires_at")
                .map_err(|e| get_err("expires_at", e))?,
        })
    }
}

#[async_trait]
impl AuthorizationCodeStore for PostgresAuthorizationCodeStore {
    async fn store_code(&self, code: &AuthorizationCode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO authorization_codes (
                code, client_id, redirect_uri, nonce, scopes, audience, identity,
                connector_id, created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&code.code)
        .bind(&code.client_id)
        .bind(&code.redirect_uri)
        .bind(&code.nonce)
        .bind(encode_json(&code.scopes)?)
        .bind(encode_json(&code.audience)?)
        .bind(encode_json(&code.identity)?)
        .bind(&code.connector_id)
        .bind(code.created_at)
        .bind(code.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "authorization code"))?;

        Ok(())
    }

    async fn consume_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthorizationCode>> {
        let row = sqlx::query(
            r#"
            DELETE FROM authorization_codes
            WHERE code = $1 AND expires_at > $2
            RETURNING code, client_id, redirect_uri, nonce, scopes, audience, identity,
                connector_id, created_at, expires_at
            "#,
        )
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        row.as_ref().map(Self::row_to_authorization_code).transpose()
    }

    async fn cleanup_expired_codes(&self, now: DateTime<Utc>) -> Result<usize> {
        let result = sqlx::query("DELETE FROM authorization_codes WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected() as usize)
    }
}
