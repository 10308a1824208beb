//! SurrealDB implementation of [`UserStore`].

use chrono::{DateTime, Utc};
use infrareg_core::error::CoreResult;
use infrareg_core::models::user::{CreateUser, Role, TwoFactorMethod, UpdateUser, User};
use infrareg_core::store::{PaginatedResult, Pagination, UserStore};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::StoreError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    email: String,
    password_hash: String,
    role: String,
    active: bool,
    two_factor_enabled: bool,
    two_factor_method: String,
    two_factor_destination: Option<String>,
    failed_login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    email: String,
    password_hash: String,
    role: String,
    active: bool,
    two_factor_enabled: bool,
    two_factor_method: String,
    two_factor_destination: Option<String>,
    failed_login_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<Role, StoreError> {
    Role::parse(s).ok_or_else(|| StoreError::Decode(format!("unknown role: {s}")))
}

fn parse_method(s: &str) -> Result<TwoFactorMethod, StoreError> {
    TwoFactorMethod::parse(s)
        .ok_or_else(|| StoreError::Decode(format!("unknown two-factor method: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, StoreError> {
        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            active: self.active,
            two_factor_enabled: self.two_factor_enabled,
            two_factor_method: parse_method(&self.two_factor_method)?,
            two_factor_destination: self.two_factor_destination,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, StoreError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| StoreError::Decode(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_role(&self.role)?,
            active: self.active,
            two_factor_enabled: self.two_factor_enabled,
            two_factor_method: parse_method(&self.two_factor_method)?,
            two_factor_destination: self.two_factor_destination,
            failed_login_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the user table seam.
pub struct SurrealUserStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealUserStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealUserStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserStore for SurrealUserStore<C> {
    async fn create(&self, input: CreateUser) -> CoreResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 email = $email, \
                 password_hash = $password_hash, \
                 role = $role, \
                 active = true, \
                 two_factor_enabled = $two_factor_enabled, \
                 two_factor_method = $two_factor_method, \
                 two_factor_destination = $two_factor_destination, \
                 failed_login_attempts = 0, \
                 locked_until = NONE, \
                 last_login_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email.to_lowercase()))
            .bind(("password_hash", input.password_hash))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("two_factor_enabled", input.two_factor_enabled))
            .bind((
                "two_factor_method",
                input.two_factor_method.as_str().to_string(),
            ))
            .bind(("two_factor_destination", input.two_factor_destination))
            .await
            .map_err(StoreError::from)?;

        let mut result = result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CoreResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email")
            .bind(("email", email.to_string()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(StoreError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_user()?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> CoreResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.active.is_some() {
            sets.push("active = $active");
        }
        if input.two_factor_enabled.is_some() {
            sets.push("two_factor_enabled = $two_factor_enabled");
        }
        if input.two_factor_method.is_some() {
            sets.push("two_factor_method = $two_factor_method");
        }
        if input.two_factor_destination.is_some() {
            sets.push("two_factor_destination = $two_factor_destination");
        }
        sets.push("updated_at = time::now()");

        let sql = format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        );

        let mut query = self.db.query(sql).bind(("id", id_str.clone()));
        if let Some(email) = input.email {
            query = query.bind(("email", email.to_lowercase()));
        }
        if let Some(role) = input.role {
            query = query.bind(("role", role.as_str().to_string()));
        }
        if let Some(active) = input.active {
            query = query.bind(("active", active));
        }
        if let Some(enabled) = input.two_factor_enabled {
            query = query.bind(("two_factor_enabled", enabled));
        }
        if let Some(method) = input.two_factor_method {
            query = query.bind(("two_factor_method", method.as_str().to_string()));
        }
        if let Some(destination) = input.two_factor_destination {
            query = query.bind(("two_factor_destination", destination));
        }

        let mut result = query.await.map_err(StoreError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn list(&self, pagination: Pagination) -> CoreResult<PaginatedResult<User>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 ORDER BY email LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(StoreError::from)?;
        let items = rows
            .into_iter()
            .map(|r| r.try_into_user())
            .collect::<Result<Vec<_>, _>>()?;

        let mut result = self
            .db
            .query("SELECT count() AS total FROM user GROUP ALL")
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

    async fn set_password_hash(&self, id: Uuid, password_hash: String) -> CoreResult<()> {
        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 password_hash = $password_hash, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(StoreError::from)?;
        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }

    async fn increment_failed_logins(&self, id: Uuid) -> CoreResult<u32> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 failed_login_attempts += 1, updated_at = time::now() \
                 RETURN AFTER",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(StoreError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(StoreError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.failed_login_attempts)
    }

    async fn reset_failed_logins(&self, id: Uuid) -> CoreResult<()> {
        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 failed_login_attempts = 0, \
                 locked_until = NONE, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(StoreError::from)?;
        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }

    async fn set_locked_until(&self, id: Uuid, locked_until: DateTime<Utc>) -> CoreResult<()> {
        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 locked_until = $locked_until, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("locked_until", locked_until))
            .await
            .map_err(StoreError::from)?;
        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<()> {
        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 failed_login_attempts = 0, \
                 locked_until = NONE, \
                 last_login_at = $at, \
                 updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(StoreError::from)?;
        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }
}
