//! Stretched, vault and note keys, and the envelope wrapping between them

use hkdf::Hkdf;
use noted_core::{NoteKeys, Sealed};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::cipher::{unwrap_key, wrap_key};
use crate::error::{CryptoError, Result};
use crate::kdf::MasterKey;
use crate::KEY_SIZE;

macro_rules! secret_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name {
            bytes: [u8; KEY_SIZE],
        }

        impl $name {
            pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
                Self { bytes }
            }

            pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.bytes
            }
        }

        impl Drop for $name {
            fn drop(&mut self) {
                self.bytes.zeroize();
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("bytes", &"[REDACTED]")
                    .finish()
            }
        }
    };
}

secret_key!(
    /// HKDF-expanded master key. Only ever used to wrap the vault key.
    StretchedKey
);

secret_key!(
    /// Random per-account key. Lives in session memory while unlocked.
    VaultKey
);

secret_key!(
    /// Random per-note key. Encrypts note content and every version payload.
    NoteKey
);

const STRETCH_INFO: &[u8] = b"encryption";

/// HKDF-SHA256 over the master key, salted with the account salt.
pub fn derive_stretched_key(master: &MasterKey, account_salt: &[u8; 32]) -> Result<StretchedKey> {
    let hk = Hkdf::<Sha256>::new(Some(&account_salt[..]), master.as_bytes());
    let mut okm = [0u8; KEY_SIZE];
    hk.expand(STRETCH_INFO, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(format!("HKDF expand failed: {e}")))?;
    Ok(StretchedKey::from_bytes(okm))
}

fn random_key() -> [u8; KEY_SIZE] {
    let mut bytes = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

pub fn generate_vault_key() -> VaultKey {
    VaultKey::from_bytes(random_key())
}

pub fn generate_note_key() -> NoteKey {
    NoteKey::from_bytes(random_key())
}

pub fn wrap_vault_key(vault_key: &VaultKey, stretched: &StretchedKey) -> Result<Sealed> {
    wrap_key(vault_key.as_bytes(), stretched.as_bytes())
}

pub fn unwrap_vault_key(wrapped: &Sealed, stretched: &StretchedKey) -> Result<VaultKey> {
    unwrap_key(wrapped, stretched.as_bytes()).map(VaultKey::from_bytes)
}

pub fn wrap_note_key(note_key: &NoteKey, vault_key: &VaultKey) -> Result<NoteKeys> {
    wrap_key(note_key.as_bytes(), vault_key.as_bytes()).map(NoteKeys::from)
}

pub fn unwrap_note_key(keys: &NoteKeys, vault_key: &VaultKey) -> Result<NoteKey> {
    unwrap_key(&keys.sealed(), vault_key.as_bytes()).map(NoteKey::from_bytes)
}
