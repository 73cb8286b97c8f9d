use noted_crypto::CryptoError;
use noted_delta::DeltaError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VersionError>;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("chain reconstruction failed: {0}")]
    ChainReconstructionFailed(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate id, duplicate version number, or a stale write.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}
