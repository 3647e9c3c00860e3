//! Credential hashing with Argon2id PHC strings

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::domain::result::{Error, Result};
use crate::domain::Argon2Params;

const SALT_LEN: usize = 16;

pub struct CredentialHasher {
    params: Argon2Params,
}

impl CredentialHasher {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            Some(self.params.hash_len as usize),
        )
        .map_err(|e| Error::Config(format!("Invalid argon2 parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash a plaintext credential into a PHC string with a fresh salt
    pub fn hash(&self, credential: &str) -> Result<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::storage(format!("Failed to encode salt: {}", e)))?;

        let hash = self
            .argon2()?
            .hash_password(credential.as_bytes(), &salt)
            .map_err(|e| Error::storage(format!("Failed to hash credential: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a plaintext credential against a stored PHC string
    ///
    /// Parameters come from the stored string. A malformed hash never matches.
    pub fn verify(&self, credential: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(credential.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}
