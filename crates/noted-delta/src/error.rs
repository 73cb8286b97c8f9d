use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeltaError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    #[error("invalid delta token: {0:?}")]
    InvalidDeltaToken(String),

    #[error("invalid length in delta token: {0:?}")]
    InvalidDeltaLength(String),

    #[error("delta reads past end of source (cursor {cursor} + {len} > {source_len})")]
    DeltaExceedsSource {
        cursor: usize,
        len: usize,
        source_len: usize,
    },

    #[error("delta consumed {consumed} of {source_len} source characters")]
    DeltaLengthMismatch { consumed: usize, source_len: usize },
}
