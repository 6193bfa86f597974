use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("failed to decode event: {0}")]
    Decode(String),
    #[error(transparent)]
    Block(#[from] pail_block::BlockError),
    #[error(transparent)]
    Core(#[from] pail_core::PailError),
}

pub type ClockResult<T> = Result<T, ClockError>;
