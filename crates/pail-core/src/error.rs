//! Error types shared by every pail crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PailError {
    #[error("CID computation failed: {0}")]
    Cid(String),

    #[error("CBOR encode failed: {0}")]
    Encode(String),

    #[error("CBOR decode failed: {0}")]
    Decode(String),

    #[error("malformed link: {0}")]
    MalformedLink(String),
}

pub type PailResult<T> = Result<T, PailError>;
