use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrdtError {
    #[error("head is empty")]
    HeadlessClock,

    #[error("unknown operation type: {0:?}")]
    UnknownOperation(String),

    #[error("no common ancestor found for head")]
    EventNotFound,

    #[error("failed to decode operation: {0}")]
    Decode(String),

    #[error(transparent)]
    Shard(#[from] pail_shard::ShardError),

    #[error(transparent)]
    Clock(#[from] pail_clock::ClockError),

    #[error(transparent)]
    Block(#[from] pail_block::BlockError),

    #[error(transparent)]
    Core(#[from] pail_core::PailError),
}

pub type CrdtResult<T> = Result<T, CrdtError>;
