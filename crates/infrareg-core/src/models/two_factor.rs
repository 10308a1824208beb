//! Second-factor code domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::TwoFactorMethod;

/// A single-use numeric verification code.
///
/// Consumed exactly once: the first successful match flips `used`, and
/// the same code never validates twice. Mismatches increment `attempts`;
/// reaching the configured ceiling invalidates the code outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorCode {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub method: TwoFactorMethod,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl TwoFactorCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTwoFactorCode {
    pub user_id: Uuid,
    pub code: String,
    pub method: TwoFactorMethod,
    pub expires_at: DateTime<Utc>,
}
