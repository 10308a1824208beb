//! SurrealDB implementation of [`GrantStore`].

use infrareg_core::error::CoreResult;
use infrareg_core::models::grant::PermissionGrant;
use infrareg_core::store::GrantStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct GrantRow {
    user_id: String,
    section: String,
    field: Option<String>,
    can_view: bool,
    can_create: bool,
    can_edit: bool,
    can_delete: bool,
}

impl GrantRow {
    fn try_into_grant(self) -> Result<PermissionGrant, StoreError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| StoreError::Decode(format!("invalid user UUID: {e}")))?;
        Ok(PermissionGrant {
            user_id,
            section: self.section,
            field: self.field,
            can_view: self.can_view,
            can_create: self.can_create,
            can_edit: self.can_edit,
            can_delete: self.can_delete,
        })
    }

    fn from_grant(grant: PermissionGrant) -> Self {
        Self {
            user_id: grant.user_id.to_string(),
            section: grant.section,
            field: grant.field,
            can_view: grant.can_view,
            can_create: grant.can_create,
            can_edit: grant.can_edit,
            can_delete: grant.can_delete,
        }
    }
}

/// SurrealDB implementation of the permission grant table seam.
pub struct SurrealGrantStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealGrantStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealGrantStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GrantStore for SurrealGrantStore<C> {
    async fn for_user(&self, user_id: Uuid) -> CoreResult<Vec<PermissionGrant>> {
        let mut result = self
            .db
            .query("SELECT * FROM permission_grant WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<GrantRow> = result.take(0).map_err(StoreError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| r.try_into_grant())
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn find(
        &self,
        user_id: Uuid,
        section: &str,
        field: Option<&str>,
    ) -> CoreResult<Option<PermissionGrant>> {
        // `field = NONE` matches the section-level row.
        let sql = match field {
            Some(_) => {
                "SELECT * FROM permission_grant \
                 WHERE user_id = $user_id AND section = $section AND field = $field"
            }
            None => {
                "SELECT * FROM permission_grant \
                 WHERE user_id = $user_id AND section = $section AND field = NONE"
            }
        };

        let mut query = self
            .db
            .query(sql)
            .bind(("user_id", user_id.to_string()))
            .bind(("section", section.to_string()));
        if let Some(field) = field {
            query = query.bind(("field", field.to_string()));
        }

        let mut result = query.await.map_err(StoreError::from)?;
        let rows: Vec<GrantRow> = result.take(0).map_err(StoreError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_grant()?)),
            None => Ok(None),
        }
    }

    async fn replace_for_user(
        &self,
        user_id: Uuid,
        grants: Vec<PermissionGrant>,
    ) -> CoreResult<()> {
        let rows: Vec<GrantRow> = grants.into_iter().map(GrantRow::from_grant).collect();

        // Clear-then-insert inside one transaction: a concurrent reader
        // sees the fully-old or fully-new grant set, never a mix.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE permission_grant WHERE user_id = $user_id; \
                 INSERT INTO permission_grant $rows; \
                 COMMIT TRANSACTION;",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("rows", rows))
            .await
            .map_err(StoreError::from)?;

        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }
}
