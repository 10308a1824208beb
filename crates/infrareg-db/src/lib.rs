//! INFRAREG Database — SurrealDB connection management, store
//! implementations, and schema migrations.
//!
//! This crate provides:
//! - Connection management and store openers ([`DbConfig`],
//!   [`RemoteStoreOpener`], [`FixedStoreOpener`])
//! - Schema initialization ([`run_migrations`] per tenant store,
//!   [`run_catalog_migrations`] for the shared catalog)
//! - Implementations of the `infrareg-core` store traits
//!   ([`store::SurrealTenantStore`] and friends)

mod connection;
mod error;
mod schema;
pub mod store;

pub use connection::{CATALOG_DB, DbConfig, FixedStoreOpener, RemoteStoreOpener};
pub use error::StoreError;
pub use schema::{run_catalog_migrations, run_migrations};
