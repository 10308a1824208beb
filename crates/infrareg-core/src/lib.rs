//! INFRAREG Core — domain models, error types, store trait seams, and
//! the shared tenant-directory / plan-catalog snapshots.
//!
//! This crate has no database dependency; concrete store
//! implementations live in `infrareg-db`, and the authorization and
//! session logic that drives these seams lives in `infrareg-auth`.

pub mod catalog;
pub mod directory;
pub mod error;
pub mod handles;
pub mod models;
pub mod store;

pub use catalog::PlanCatalog;
pub use directory::TenantDirectory;
pub use error::{CoreError, CoreResult};
pub use handles::StoreManager;
