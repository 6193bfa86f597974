use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShardError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("malformed shard CBOR: {0}")]
    Decode(String),

    #[error("unsupported root shard version: {0}")]
    UnsupportedVersion(i64),

    #[error("unsupported key character set: {0}")]
    UnsupportedKeyChars(String),

    #[error("key contains non-printable-ASCII characters: {0:?}")]
    NonPrintableKey(String),

    #[error("key exceeds max size of {max} bytes: {key:?}")]
    KeyTooLong { key: String, max: i64 },

    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error(transparent)]
    Block(#[from] pail_block::BlockError),

    #[error(transparent)]
    Core(#[from] pail_core::PailError),
}

pub type ShardResult<T> = Result<T, ShardError>;
