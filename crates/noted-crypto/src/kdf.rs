//! Key derivation: master password → master key, master key → verifier

use argon2::{Algorithm, Argon2, Params, Version};
use noted_core::config::KdfConfig;
use noted_core::KdfAlgorithm;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::compare::secure_compare;
use crate::error::{CryptoError, Result};
use crate::KEY_SIZE;

/// A 256-bit master key derived from the master password via Argon2id.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Hardened proof of password knowledge. Stored by the account store and
/// never used as key material.
pub struct Verifier {
    bytes: [u8; KEY_SIZE],
}

impl Verifier {
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Compare against a stored verifier without a timing side channel.
    pub fn matches(&self, stored: &[u8]) -> bool {
        secure_compare(&self.bytes, stored)
    }
}

impl Drop for Verifier {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 4)
    pub time_cost: u32,
    /// Parallelism (default: 3)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 4,
            parallelism: 3,
        }
    }
}

impl KdfParams {
    /// The identifier recorded on an account so unlock can reproduce the derivation.
    pub fn algorithm(&self) -> KdfAlgorithm {
        KdfAlgorithm::Argon2idV1 {
            mem_cost_kib: self.mem_cost_kib,
            time_cost: self.time_cost,
            parallelism: self.parallelism,
        }
    }

    pub fn from_algorithm(algorithm: &KdfAlgorithm) -> Self {
        match *algorithm {
            KdfAlgorithm::Argon2idV1 {
                mem_cost_kib,
                time_cost,
                parallelism,
            } => Self {
                mem_cost_kib,
                time_cost,
                parallelism,
            },
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.mem_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2id params: {e}")))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            mem_cost_kib: config.mem_cost_kib,
            time_cost: config.time_cost,
            parallelism: config.parallelism,
        }
    }
}

/// Per-account KDF salt: SHA-256 of the lower-cased stable account identifier.
pub fn account_salt(account_id: &str) -> [u8; 32] {
    Sha256::digest(account_id.to_lowercase().as_bytes()).into()
}

/// SHA-256 of the password, used as the verifier's salt.
pub fn password_digest(password: &SecretString) -> [u8; 32] {
    Sha256::digest(password.expose_secret().as_bytes()).into()
}

/// Derive the 256-bit master key from the master password using Argon2id.
///
/// The caller is responsible for having run [`crate::check_password_strength`]
/// on a new password; this function does not re-validate.
pub fn derive_master_key(
    password: &SecretString,
    account_salt: &[u8; 32],
    params: &KdfParams,
) -> Result<MasterKey> {
    tracing::debug!(
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        "deriving master key"
    );
    let mut key = [0u8; KEY_SIZE];
    params
        .argon2()?
        .hash_password_into(password.expose_secret().as_bytes(), account_salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2id KDF failed: {e}")))?;

    Ok(MasterKey::from_bytes(key))
}

/// Second Argon2id pass: master key as the password, password digest as the salt.
pub fn derive_verifier(
    master: &MasterKey,
    password_digest: &[u8; 32],
    params: &KdfParams,
) -> Result<Verifier> {
    tracing::debug!("deriving verifier");
    let mut bytes = [0u8; KEY_SIZE];
    params
        .argon2()?
        .hash_password_into(master.as_bytes(), password_digest, &mut bytes)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2id verifier failed: {e}")))?;

    Ok(Verifier { bytes })
}
