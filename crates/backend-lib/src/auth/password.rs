// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
use scrypt::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Params, Scrypt,
};

use crate::error::AppError;

/// Scrypt hasher with a configurable cost.
///
/// Verification reads the parameters back out of the PHC string, so hashes
/// made with a different cost still verify.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// `log_n` is the scrypt CPU/memory cost exponent
    pub fn new(log_n: u8) -> Result<Self, AppError> {
        let params = Params::new(log_n, Params::RECOMMENDED_R, Params::RECOMMENDED_P, Params::RECOMMENDED_LEN)
            .map_err(|e| AppError::PasswordHash(e.to_string()))?;
        Ok(Self { params })
    }

    /// Hash a password using scrypt
    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(plain.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| AppError::PasswordHash(e.to_string()))?
            .to_string();
        Ok(hash)
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::recommended(),
        }
    }
}

/// Verify a password against a hash
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}
