//! Authentication configuration.

/// Configuration for the session manager and authorization engine.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 86_400 = 24 hours).
    pub session_lifetime_secs: u64,
    /// Consecutive failed logins before lockout (default: 5).
    pub max_failed_logins: u32,
    /// Lockout window in seconds (default: 900 = 15 minutes).
    pub lockout_secs: u64,
    /// Number of digits in a second-factor code (default: 6).
    pub two_factor_code_length: usize,
    /// Second-factor code lifetime in seconds (default: 600 = 10 min).
    pub two_factor_lifetime_secs: u64,
    /// Wrong guesses before a code is invalidated outright (default: 3).
    pub two_factor_max_attempts: u32,
    /// Upper bound on outbound code dispatch; on expiry the code is
    /// treated as sent rather than hanging the login (default: 3000 ms).
    pub dispatch_timeout_millis: u64,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Optional pepper prepended to passwords before hashing.
    pub pepper: Option<String>,
    /// Tenant whose superadmins may run provisioning operations.
    pub master_tenant: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: 86_400,
            max_failed_logins: 5,
            lockout_secs: 900,
            two_factor_code_length: 6,
            two_factor_lifetime_secs: 600,
            two_factor_max_attempts: 3,
            dispatch_timeout_millis: 3_000,
            min_password_length: 10,
            pepper: None,
            master_tenant: "master".into(),
        }
    }
}
