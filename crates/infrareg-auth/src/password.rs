//! Password hashing and verification.
//!
//! Stored hashes come in two formats: the legacy scheme is a bare
//! SHA-256 hex digest inherited from older installations; the modern
//! scheme is Argon2id in PHC string format (OWASP parameters: 19 MiB,
//! t=2, p=1). Verification dispatches on a parsed tag, and a
//! successful legacy verification signals the caller to re-hash and
//! persist the modern format.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// A stored password hash, tagged by format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordHash {
    /// Bare SHA-256 hex digest (64 hex chars), unsalted.
    Legacy(String),
    /// Argon2id PHC string (`$argon2id$...`).
    Modern(String),
}

impl PasswordHash {
    pub fn parse(stored: &str) -> Result<Self, AuthError> {
        if stored.starts_with("$argon2") {
            return Ok(PasswordHash::Modern(stored.to_string()));
        }
        if stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(PasswordHash::Legacy(stored.to_lowercase()));
        }
        Err(AuthError::Crypto("unrecognized password hash format".into()))
    }
}

/// Outcome of a password verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOutcome {
    pub valid: bool,
    /// Set when a legacy hash verified and must be upgraded in place.
    pub needs_upgrade: bool,
}

fn owasp_argon2() -> Result<Argon2<'static>, AuthError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

fn peppered<'a>(password: &'a str, pepper: Option<&str>, buf: &'a mut String) -> &'a [u8] {
    match pepper {
        Some(p) => {
            *buf = format!("{p}{password}");
            buf.as_bytes()
        }
        None => password.as_bytes(),
    }
}

/// Hash a password with Argon2id. The salt is randomly generated per
/// call; if a pepper is provided it is prepended first.
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let argon2 = owasp_argon2()?;
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored hash of either format.
pub fn verify_password(
    password: &str,
    stored: &str,
    pepper: Option<&str>,
) -> Result<VerifyOutcome, AuthError> {
    match PasswordHash::parse(stored)? {
        PasswordHash::Modern(phc) => {
            let mut buf = String::new();
            let input = peppered(password, pepper, &mut buf);
            let parsed = argon2::PasswordHash::new(&phc)
                .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;
            match owasp_argon2()?.verify_password(input, &parsed) {
                Ok(()) => Ok(VerifyOutcome {
                    valid: true,
                    needs_upgrade: false,
                }),
                Err(argon2::password_hash::Error::Password) => Ok(VerifyOutcome {
                    valid: false,
                    needs_upgrade: false,
                }),
                Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
            }
        }
        PasswordHash::Legacy(digest) => {
            // Legacy installations hashed the bare password, no pepper.
            let mut hasher = Sha256::new();
            hasher.update(password.as_bytes());
            let computed = hex::encode(hasher.finalize());
            let valid = computed == digest;
            Ok(VerifyOutcome {
                valid,
                needs_upgrade: valid,
            })
        }
    }
}

/// Burn the cost of a real Argon2id verification without a stored hash.
///
/// Called on the paths that fail before password verification (unknown
/// email, inactive account, active lockout) so that their timing is
/// indistinguishable from a wrong-password failure.
pub fn dummy_verify(password: &str, pepper: Option<&str>) {
    const DUMMY_SALT: &[u8] = b"infrareg-dummy-salt";
    let Ok(argon2) = owasp_argon2() else {
        return;
    };
    let mut buf = String::new();
    let input = peppered(password, pepper, &mut buf);
    let mut out = [0u8; 32];
    let _ = argon2.hash_password_into(input, DUMMY_SALT, &mut out);
}
