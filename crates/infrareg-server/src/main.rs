//! INFRAREG Server — application entry point.
//!
//! Boot sequence: connect the shared catalog store, apply catalog
//! migrations, load the tenant directory and plan catalog snapshots,
//! and wire the session and authorization engines around the remote
//! store opener.

use std::sync::Arc;

use infrareg_auth::{AuthorizationEngine, LogNotifier, SessionManager, TenantProvisioner};
use infrareg_core::{PlanCatalog, TenantDirectory};
use infrareg_db::store::{SurrealDirectoryStore, SurrealPlanStore};
use infrareg_db::{RemoteStoreOpener, run_catalog_migrations};
use tracing_subscriber::EnvFilter;

mod config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("infrareg=info")),
        )
        .json()
        .init();

    tracing::info!("Starting INFRAREG server...");

    let db_config = config::db_config_from_env();
    let auth_config = config::auth_config_from_env();
    let master_tenant = auth_config.master_tenant.clone();

    let catalog_db = db_config.connect_catalog().await?;
    run_catalog_migrations(&catalog_db).await?;

    let directory_store = SurrealDirectoryStore::new(catalog_db.clone());
    let plan_store = SurrealPlanStore::new(catalog_db);

    let directory = Arc::new(TenantDirectory::load_from(&directory_store).await?);
    let catalog = Arc::new(PlanCatalog::load_from(&plan_store).await?);
    tracing::info!(
        tenants = directory.snapshot().len(),
        plans = catalog.snapshot().len(),
        "catalog snapshots loaded"
    );

    let _opener = RemoteStoreOpener::new(db_config);
    let _sessions = SessionManager::new(directory.clone(), LogNotifier, auth_config);
    let _authz = AuthorizationEngine::new(directory.clone(), catalog.clone());
    let _provisioner =
        TenantProvisioner::new(directory, catalog, directory_store, master_tenant);

    tracing::info!("INFRAREG engine ready");

    // TODO: mount the HTTP API once the transport layer lands
    tokio::signal::ctrl_c().await?;

    tracing::info!("INFRAREG server stopped.");
    Ok(())
}
