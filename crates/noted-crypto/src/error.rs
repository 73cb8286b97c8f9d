use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Wrong password, or account key material that does not open. The two
    /// are deliberately indistinguishable.
    #[error("invalid master password")]
    InvalidMasterPassword,

    #[error("decryption failed (authentication tag mismatch, wrong key, or wrong nonce)")]
    DecryptionFailed,

    #[error("encryption failed")]
    EncryptionFailed,

    #[error("password too weak: {0}")]
    WeakPassword(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("vault is locked")]
    Locked,
}
