//! Environment-driven configuration for the server binary.

use std::env;

use infrareg_auth::AuthConfig;
use infrareg_db::DbConfig;

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.parse().ok())
}

/// Build a [`DbConfig`] from `INFRAREG_DB_*` environment variables,
/// falling back to the defaults for anything unset.
pub fn db_config_from_env() -> DbConfig {
    let mut config = DbConfig::default();
    if let Some(url) = var("INFRAREG_DB_URL") {
        config.url = url;
    }
    if let Some(ns) = var("INFRAREG_DB_NAMESPACE") {
        config.namespace = ns;
    }
    if let Some(user) = var("INFRAREG_DB_USERNAME") {
        config.username = user;
    }
    if let Some(pass) = var("INFRAREG_DB_PASSWORD") {
        config.password = pass;
    }
    config
}

/// Build an [`AuthConfig`] from `INFRAREG_AUTH_*` environment
/// variables, falling back to the defaults for anything unset.
pub fn auth_config_from_env() -> AuthConfig {
    let mut config = AuthConfig::default();
    if let Some(v) = parse_var("INFRAREG_AUTH_SESSION_LIFETIME_SECS") {
        config.session_lifetime_secs = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_MAX_FAILED_LOGINS") {
        config.max_failed_logins = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_LOCKOUT_SECS") {
        config.lockout_secs = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_2FA_CODE_LENGTH") {
        config.two_factor_code_length = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_2FA_LIFETIME_SECS") {
        config.two_factor_lifetime_secs = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_2FA_MAX_ATTEMPTS") {
        config.two_factor_max_attempts = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_DISPATCH_TIMEOUT_MILLIS") {
        config.dispatch_timeout_millis = v;
    }
    if let Some(v) = parse_var("INFRAREG_AUTH_MIN_PASSWORD_LENGTH") {
        config.min_password_length = v;
    }
    if let Some(v) = var("INFRAREG_AUTH_PEPPER") {
        config.pepper = Some(v);
    }
    if let Some(v) = var("INFRAREG_AUTH_MASTER_TENANT") {
        config.master_tenant = v;
    }
    config
}
