use pail_core::Link;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockError {
    #[error("block not found for link: {0}")]
    NotFound(Link),

    #[error(transparent)]
    Core(#[from] pail_core::PailError),
}

pub type BlockResult<T> = Result<T, BlockError>;
