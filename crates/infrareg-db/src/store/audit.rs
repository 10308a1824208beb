//! SurrealDB implementation of [`AuditStore`].

use chrono::{DateTime, Utc};
use infrareg_core::error::CoreResult;
use infrareg_core::models::audit::{AuditEntry, AuditOutcome, NewAuditEntry};
use infrareg_core::store::{AuditFilter, AuditStore, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    actor_id: Option<String>,
    action: String,
    entity: String,
    entity_id: Option<String>,
    before: serde_json::Value,
    after: serde_json::Value,
    outcome: String,
    ip_address: Option<String>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct AuditRowWithId {
    record_id: String,
    actor_id: Option<String>,
    action: String,
    entity: String,
    entity_id: Option<String>,
    before: serde_json::Value,
    after: serde_json::Value,
    outcome: String,
    ip_address: Option<String>,
    timestamp: DateTime<Utc>,
}

fn parse_actor(actor_id: Option<String>) -> Result<Option<Uuid>, StoreError> {
    actor_id
        .map(|s| {
            Uuid::parse_str(&s).map_err(|e| StoreError::Decode(format!("invalid actor UUID: {e}")))
        })
        .transpose()
}

fn parse_outcome(s: &str) -> Result<AuditOutcome, StoreError> {
    AuditOutcome::parse(s).ok_or_else(|| StoreError::Decode(format!("unknown outcome: {s}")))
}

fn row_to_entry(row: AuditRow, id: Uuid) -> Result<AuditEntry, StoreError> {
    Ok(AuditEntry {
        id,
        actor_id: parse_actor(row.actor_id)?,
        action: row.action,
        entity: row.entity,
        entity_id: row.entity_id,
        before: row.before,
        after: row.after,
        outcome: parse_outcome(&row.outcome)?,
        ip_address: row.ip_address,
        timestamp: row.timestamp,
    })
}

impl AuditRowWithId {
    fn try_into_entry(self) -> Result<AuditEntry, StoreError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| StoreError::Decode(format!("invalid UUID: {e}")))?;
        Ok(AuditEntry {
            id,
            actor_id: parse_actor(self.actor_id)?,
            action: self.action,
            entity: self.entity,
            entity_id: self.entity_id,
            before: self.before,
            after: self.after,
            outcome: parse_outcome(&self.outcome)?,
            ip_address: self.ip_address,
            timestamp: self.timestamp,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the append-only audit log.
pub struct SurrealAuditStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealAuditStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealAuditStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditStore for SurrealAuditStore<C> {
    async fn append(&self, input: NewAuditEntry) -> CoreResult<AuditEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 actor_id = $actor_id, \
                 action = $action, \
                 entity = $entity, \
                 entity_id = $entity_id, \
                 before = $before, \
                 after = $after, \
                 outcome = $outcome, \
                 ip_address = $ip_address",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor_id", input.actor_id.map(|a| a.to_string())))
            .bind(("action", input.action))
            .bind(("entity", input.entity))
            .bind(("entity_id", input.entity_id))
            .bind(("before", input.before))
            .bind(("after", input.after))
            .bind(("outcome", input.outcome.as_str().to_string()))
            .bind(("ip_address", input.ip_address))
            .await
            .map_err(StoreError::from)?;

        let mut result = result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let rows: Vec<AuditRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row_to_entry(row, id)?)
    }

    async fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> CoreResult<PaginatedResult<AuditEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("actor_id = $actor_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }
        if filter.from.is_some() {
            conditions.push("timestamp >= $from");
        }
        if filter.to.is_some() {
            conditions.push("timestamp <= $to");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {} ", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause}\
             ORDER BY timestamp DESC LIMIT $limit START $offset"
        );
        let count_sql = format!("SELECT count() AS total FROM audit_log {where_clause}GROUP ALL");

        fn bind_filter<'a, C: Connection>(
            filter: &AuditFilter,
            mut query: surrealdb::method::Query<'a, C>,
        ) -> surrealdb::method::Query<'a, C> {
            if let Some(actor_id) = &filter.actor_id {
                query = query.bind(("actor_id", actor_id.to_string()));
            }
            if let Some(action) = &filter.action {
                query = query.bind(("action", action.clone()));
            }
            if let Some(from) = filter.from {
                query = query.bind(("from", from));
            }
            if let Some(to) = filter.to {
                query = query.bind(("to", to));
            }
            query
        }

        let query = bind_filter(&filter, self.db.query(sql))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        let mut result = query.await.map_err(StoreError::from)?;
        let rows: Vec<AuditRowWithId> = result.take(0).map_err(StoreError::from)?;
        let items = rows
            .into_iter()
            .map(|r| r.try_into_entry())
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = bind_filter(&filter, self.db.query(count_sql))
            .await
            .map_err(StoreError::from)?;
        let counts: Vec<CountRow> = result.take(0).map_err(StoreError::from)?;
        let total = counts.first().map(|c| c.total).unwrap_or(0);

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
