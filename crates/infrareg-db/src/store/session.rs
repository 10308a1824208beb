//! SurrealDB implementation of [`SessionStore`].

use chrono::{DateTime, Utc};
use infrareg_core::error::CoreResult;
use infrareg_core::models::session::{CreateSession, Session};
use infrareg_core::store::SessionStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    token_hash: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    token_hash: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

fn row_to_session(row: SessionRow, id: Uuid) -> Result<Session, StoreError> {
    let user_id = Uuid::parse_str(&row.user_id)
        .map_err(|e| StoreError::Decode(format!("invalid user UUID: {e}")))?;
    Ok(Session {
        id,
        user_id,
        token_hash: row.token_hash,
        ip_address: row.ip_address,
        user_agent: row.user_agent,
        expires_at: row.expires_at,
        created_at: row.created_at,
    })
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, StoreError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| StoreError::Decode(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| StoreError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(Session {
            id,
            user_id,
            token_hash: self.token_hash,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the session table seam.
pub struct SurrealSessionStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealSessionStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealSessionStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionStore for SurrealSessionStore<C> {
    async fn create(&self, input: CreateSession) -> CoreResult<Session> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 user_id = $user_id, \
                 token_hash = $token_hash, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(StoreError::from)?;

        let mut result = result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row_to_session(row, id)?)
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> CoreResult<Option<Session>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(StoreError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_session()?)),
            None => Ok(None),
        }
    }

    async fn delete_by_token_hash(&self, token_hash: &str) -> CoreResult<()> {
        let result = self
            .db
            .query("DELETE session WHERE token_hash = $token_hash")
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(StoreError::from)?;
        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> CoreResult<u64> {
        let mut result = self
            .db
            .query(
                "DELETE session WHERE user_id = $user_id RETURN BEFORE;",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(StoreError::from)?;
        Ok(rows.len() as u64)
    }

    async fn delete_expired(&self) -> CoreResult<u64> {
        let mut result = self
            .db
            .query("DELETE session WHERE expires_at <= time::now() RETURN BEFORE;")
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(StoreError::from)?;
        Ok(rows.len() as u64)
    }
}
