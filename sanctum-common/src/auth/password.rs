//! Password hashing (Argon2id)

use argon2::password_hash::{
    rand_core, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Error, Result};

/// Argon2id work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
        }
    }
}

impl HashCost {
    /// Smallest cost argon2 accepts; only suitable for tests
    pub const fn minimal() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
        }
    }
}

/// Hashes and verifies passwords with a fixed work factor
///
/// Cheap to clone. The blocking variants move the work onto tokio's
/// blocking pool so request handlers never stall the runtime.
#[derive(Clone)]
pub struct PasswordService {
    params: Params,
    // Verified against when a login names an unknown user so both paths cost the same
    dummy_hash: Arc<str>,
}

impl std::fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordService")
            .field("memory_kib", &self.params.m_cost())
            .field("iterations", &self.params.t_cost())
            .finish()
    }
}

impl PasswordService {
    pub fn new(cost: HashCost) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, None)
            .map_err(|e| Error::Config(format!("Invalid password hash parameters: {}", e)))?;

        let mut service = Self {
            params,
            dummy_hash: Arc::from(""),
        };
        service.dummy_hash = Arc::from(service.hash_password("sanctum-dummy-password")?);
        Ok(service)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string (random salt per call)
    pub fn hash_password(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand_core::OsRng);

        self.argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a plaintext password against a stored PHC string
    ///
    /// A malformed hash verifies as `false`.
    pub fn verify_password(&self, plaintext: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// [`hash_password`](Self::hash_password) on the blocking pool
    pub async fn hash_password_blocking(&self, plaintext: String) -> Result<String> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.hash_password(&plaintext))
            .await
            .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
    }

    /// [`verify_password`](Self::verify_password) on the blocking pool
    pub async fn verify_password_blocking(&self, plaintext: String, hash: String) -> bool {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.verify_password(&plaintext, &hash))
            .await
            .unwrap_or(false)
    }

    /// Burn one verification against a throwaway hash
    pub async fn verify_dummy(&self, plaintext: String) {
        let hash = self.dummy_hash.to_string();
        let _ = self.verify_password_blocking(plaintext, hash).await;
    }
}
