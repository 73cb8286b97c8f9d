//! noted-crypto: client-side key hierarchy and content cipher
//!
//! Key hierarchy:
//! ```text
//! Master password
//!   └── Master Key (Argon2id, salt = SHA-256(lowercase(account id)))
//!       ├── Verifier (Argon2id again, password = master key, salt = SHA-256(password))
//!       │     stored server-side, only ever compared
//!       └── Stretched Key (HKDF-SHA256, info = "encryption")
//!           └── Vault Key (256-bit random, AES-256-GCM wrapped, session memory only)
//!               └── Note Key (256-bit random per note, wrapped by the vault key)
//!                   └── note content + every version payload (AES-256-GCM)
//! ```
//!
//! Every seal draws a fresh 96-bit nonce from the OS RNG.

pub mod cipher;
pub mod compare;
pub mod error;
pub mod kdf;
pub mod keys;
pub mod password;
pub mod session;

pub use cipher::{decrypt, decrypt_text, encrypt, encrypt_text, unwrap_key, wrap_key};
pub use compare::secure_compare;
pub use error::{CryptoError, Result};
pub use kdf::{
    account_salt, derive_master_key, derive_verifier, password_digest, KdfParams, MasterKey,
    Verifier,
};
pub use keys::{
    derive_stretched_key, generate_note_key, generate_vault_key, unwrap_note_key,
    unwrap_vault_key, wrap_note_key, wrap_vault_key, NoteKey, StretchedKey, VaultKey,
};
pub use password::check_password_strength;
pub use session::{rekey_account, setup_account, SessionState, VaultSession};

/// Size of every symmetric key in the hierarchy (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
