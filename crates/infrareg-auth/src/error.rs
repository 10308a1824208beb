//! Authentication and authorization error types.
//!
//! Login failures are deliberately coarse: unknown email, wrong
//! password, and inactive account all surface as `InvalidCredentials`
//! so a caller cannot learn which tenant (if any) owns an address.

use infrareg_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("account is locked")]
    AccountLocked,

    #[error("invalid verification code")]
    InvalidTwoFactorCode,

    #[error("verification code expired after too many attempts")]
    TwoFactorExpired,

    #[error("session is expired or invalid")]
    SessionExpired,

    #[error("module not available on the tenant's plan: {section}")]
    ModuleNotAvailable { section: String },

    #[error("permission denied: {action} on {section}")]
    PermissionDenied { section: String, action: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<CoreError> for AuthError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => AuthError::NotFound { entity, id },
            CoreError::AlreadyExists { entity } => {
                AuthError::Validation(format!("{entity} already exists"))
            }
            CoreError::Validation { message } => AuthError::Validation(message),
            CoreError::Crypto(msg) => AuthError::Crypto(msg),
            other => AuthError::Store(other.to_string()),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
