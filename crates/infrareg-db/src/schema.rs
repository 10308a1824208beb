//! Schema definitions and migration runner for SurrealDB.
//!
//! Per-tenant stores use SCHEMAFULL tables for data integrity. UUIDs
//! are stored as strings; enums are stored as strings with ASSERT
//! constraints. The shared catalog store holds two whole-document
//! tables (tenant directory, plan catalog) which are rewritten as a
//! unit, never patched.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::StoreError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static TENANT_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "tenant_store_initial",
    sql: TENANT_SCHEMA_V1,
}];

static CATALOG_MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "catalog_store_initial",
    sql: CATALOG_SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Tenant store schema v1
// -----------------------------------------------------------------------

const TENANT_SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['guest', 'user', 'operator', 'admin', 'superadmin'];
DEFINE FIELD active ON TABLE user TYPE bool DEFAULT true;
DEFINE FIELD two_factor_enabled ON TABLE user TYPE bool DEFAULT false;
DEFINE FIELD two_factor_method ON TABLE user TYPE string \
    ASSERT $value IN ['email', 'sms'];
DEFINE FIELD two_factor_destination ON TABLE user TYPE option<string>;
DEFINE FIELD failed_login_attempts ON TABLE user TYPE int DEFAULT 0;
DEFINE FIELD locked_until ON TABLE user TYPE option<datetime>;
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD user_id ON TABLE session TYPE string;
DEFINE FIELD token_hash ON TABLE session TYPE string;
DEFINE FIELD ip_address ON TABLE session TYPE option<string>;
DEFINE FIELD user_agent ON TABLE session TYPE option<string>;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_session_user ON TABLE session COLUMNS user_id;

-- =======================================================================
-- Second-factor codes
-- =======================================================================
DEFINE TABLE two_factor_code SCHEMAFULL;
DEFINE FIELD user_id ON TABLE two_factor_code TYPE string;
DEFINE FIELD code ON TABLE two_factor_code TYPE string;
DEFINE FIELD method ON TABLE two_factor_code TYPE string \
    ASSERT $value IN ['email', 'sms'];
DEFINE FIELD expires_at ON TABLE two_factor_code TYPE datetime;
DEFINE FIELD used ON TABLE two_factor_code TYPE bool DEFAULT false;
DEFINE FIELD attempts ON TABLE two_factor_code TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE two_factor_code TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_twofactor_user ON TABLE two_factor_code COLUMNS user_id;

-- =======================================================================
-- Granular permission grants
-- =======================================================================
DEFINE TABLE permission_grant SCHEMAFULL;
DEFINE FIELD user_id ON TABLE permission_grant TYPE string;
DEFINE FIELD section ON TABLE permission_grant TYPE string;
DEFINE FIELD field ON TABLE permission_grant TYPE option<string>;
DEFINE FIELD can_view ON TABLE permission_grant TYPE bool DEFAULT false;
DEFINE FIELD can_create ON TABLE permission_grant TYPE bool DEFAULT false;
DEFINE FIELD can_edit ON TABLE permission_grant TYPE bool DEFAULT false;
DEFINE FIELD can_delete ON TABLE permission_grant TYPE bool DEFAULT false;
DEFINE INDEX idx_grant_user_section ON TABLE permission_grant \
    COLUMNS user_id, section;

-- =======================================================================
-- Audit log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL;
DEFINE FIELD actor_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD entity ON TABLE audit_log TYPE string;
DEFINE FIELD entity_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD before ON TABLE audit_log TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD after ON TABLE audit_log TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD ip_address ON TABLE audit_log TYPE option<string>;
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime DEFAULT time::now();
DEFINE INDEX idx_audit_actor ON TABLE audit_log COLUMNS actor_id;
";

// -----------------------------------------------------------------------
// Shared catalog store schema v1
// -----------------------------------------------------------------------

const CATALOG_SCHEMA_V1: &str = "\
-- Whole-document tables: exactly one record each, rewritten as a unit.
DEFINE TABLE tenant_directory SCHEMALESS;
DEFINE TABLE plan_catalog SCHEMALESS;
";

// -----------------------------------------------------------------------
// Runner
// -----------------------------------------------------------------------

async fn apply<C: Connection>(
    db: &Surreal<C>,
    migrations: &[Migration],
    scope: &str,
) -> Result<(), StoreError> {
    let result = db.query(MIGRATION_TABLE_DDL).await?;
    result
        .check()
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version, name FROM _migration ORDER BY version")
        .await?;
    let applied: Vec<MigrationRecord> = result.take(0)?;
    let current = applied.iter().map(|m| m.version).max().unwrap_or(0);

    for migration in migrations.iter().filter(|m| m.version > current) {
        let result = db.query(migration.sql).await?;
        result
            .check()
            .map_err(|e| StoreError::Migration(format!("{}: {e}", migration.name)))?;

        let result = db
            .query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name.to_string()))
            .await?;
        result
            .check()
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        info!(
            scope,
            version = migration.version,
            name = migration.name,
            "applied migration"
        );
    }

    Ok(())
}

/// Bring one tenant's store up to the current schema version.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), StoreError> {
    apply(db, TENANT_MIGRATIONS, "tenant").await
}

/// Bring the shared catalog store up to the current schema version.
pub async fn run_catalog_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), StoreError> {
    apply(db, CATALOG_MIGRATIONS, "catalog").await
}
