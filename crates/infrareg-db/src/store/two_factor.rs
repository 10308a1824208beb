//! SurrealDB implementation of [`TwoFactorStore`].

use chrono::{DateTime, Utc};
use infrareg_core::error::CoreResult;
use infrareg_core::models::two_factor::{CreateTwoFactorCode, TwoFactorCode};
use infrareg_core::models::user::TwoFactorMethod;
use infrareg_core::store::TwoFactorStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct CodeRow {
    user_id: String,
    code: String,
    method: String,
    expires_at: DateTime<Utc>,
    used: bool,
    attempts: u32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CodeRowWithId {
    record_id: String,
    user_id: String,
    code: String,
    method: String,
    expires_at: DateTime<Utc>,
    used: bool,
    attempts: u32,
    created_at: DateTime<Utc>,
}

fn parse_method(s: &str) -> Result<TwoFactorMethod, StoreError> {
    TwoFactorMethod::parse(s)
        .ok_or_else(|| StoreError::Decode(format!("unknown two-factor method: {s}")))
}

fn row_to_code(row: CodeRow, id: Uuid) -> Result<TwoFactorCode, StoreError> {
    let user_id = Uuid::parse_str(&row.user_id)
        .map_err(|e| StoreError::Decode(format!("invalid user UUID: {e}")))?;
    Ok(TwoFactorCode {
        id,
        user_id,
        code: row.code,
        method: parse_method(&row.method)?,
        expires_at: row.expires_at,
        used: row.used,
        attempts: row.attempts,
        created_at: row.created_at,
    })
}

impl CodeRowWithId {
    fn try_into_code(self) -> Result<TwoFactorCode, StoreError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| StoreError::Decode(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| StoreError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(TwoFactorCode {
            id,
            user_id,
            code: self.code,
            method: parse_method(&self.method)?,
            expires_at: self.expires_at,
            used: self.used,
            attempts: self.attempts,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the second-factor code table seam.
pub struct SurrealTwoFactorStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealTwoFactorStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealTwoFactorStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TwoFactorStore for SurrealTwoFactorStore<C> {
    async fn create(&self, input: CreateTwoFactorCode) -> CoreResult<TwoFactorCode> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('two_factor_code', $id) SET \
                 user_id = $user_id, \
                 code = $code, \
                 method = $method, \
                 expires_at = $expires_at, \
                 used = false, \
                 attempts = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("code", input.code))
            .bind(("method", input.method.as_str().to_string()))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(StoreError::from)?;

        let mut result = result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let rows: Vec<CodeRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "two_factor_code".into(),
            id: id_str,
        })?;

        Ok(row_to_code(row, id)?)
    }

    async fn newest_pending(&self, user_id: Uuid) -> CoreResult<Option<TwoFactorCode>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM two_factor_code \
                 WHERE user_id = $user_id AND used = false \
                 ORDER BY created_at DESC LIMIT 1",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<CodeRowWithId> = result.take(0).map_err(StoreError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_code()?)),
            None => Ok(None),
        }
    }

    async fn mark_used(&self, id: Uuid) -> CoreResult<()> {
        let result = self
            .db
            .query("UPDATE type::record('two_factor_code', $id) SET used = true")
            .bind(("id", id.to_string()))
            .await
            .map_err(StoreError::from)?;
        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }

    async fn increment_attempts(&self, id: Uuid) -> CoreResult<u32> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('two_factor_code', $id) SET \
                 attempts += 1 RETURN AFTER",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<CodeRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "two_factor_code".into(),
            id: id_str,
        })?;

        Ok(row.attempts)
    }

    async fn invalidate_all(&self, user_id: Uuid) -> CoreResult<u64> {
        let mut result = self
            .db
            .query(
                "UPDATE two_factor_code SET used = true \
                 WHERE user_id = $user_id AND used = false",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<CodeRow> = result.take(0).map_err(StoreError::from)?;
        Ok(rows.len() as u64)
    }
}
