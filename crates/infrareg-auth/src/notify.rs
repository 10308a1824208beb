//! Outbound notification seam for second-factor codes and password
//! reset links.
//!
//! Delivery is fire-and-forget with best-effort semantics: a dispatch
//! failure is logged by the caller and never surfaces as an
//! authentication failure. Environments without configured credentials
//! use [`LogNotifier`], which records the payload and reports success.

use infrareg_core::models::user::TwoFactorMethod;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[error("notification dispatch failed: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn send_two_factor_code(
        &self,
        destination: &str,
        code: &str,
        method: TwoFactorMethod,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;

    fn send_password_reset(
        &self,
        destination: &str,
        token: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Not-sent no-op for local and test environments: logs the code
/// instead of delivering it, and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn send_two_factor_code(
        &self,
        destination: &str,
        code: &str,
        method: TwoFactorMethod,
    ) -> Result<(), NotifyError> {
        info!(destination, code, method = method.as_str(), "two-factor code (not sent)");
        Ok(())
    }

    async fn send_password_reset(&self, destination: &str, token: &str) -> Result<(), NotifyError> {
        info!(destination, token, "password reset token (not sent)");
        Ok(())
    }
}
