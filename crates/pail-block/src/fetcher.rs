//! Fetcher capability: given a link, return its block. Production block
//! storage (disk, S3, IPFS) lives outside this crate; only the interface
//! and an in-memory implementation for tests/overlays are provided here.

use std::sync::Arc;

use async_trait::async_trait;
use pail_core::Link;

use crate::block::Block;
use crate::error::BlockResult;

/// Returns the bytes for a link, or [`crate::error::BlockError::NotFound`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, link: &Link) -> BlockResult<Block>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn get(&self, link: &Link) -> BlockResult<Block> {
        (**self).get(link).await
    }
}

/// Tries a sequence of fetchers in order; the first successful one wins,
/// otherwise the last error is returned. Used to overlay a transient
/// in-memory map atop the durable store during a multi-step mutation.
///
/// Parameterized over a lifetime (rather than requiring `'static` fetchers)
/// so a caller-held `&dyn Fetcher` can be tiered alongside an owned overlay
/// without cloning the underlying store.
pub struct TieredFetcher<'a> {
    fetchers: Vec<Arc<dyn Fetcher + 'a>>,
}

impl<'a> TieredFetcher<'a> {
    pub fn new(fetchers: Vec<Arc<dyn Fetcher + 'a>>) -> Self {
        Self { fetchers }
    }
}

#[async_trait]
impl<'a> Fetcher for TieredFetcher<'a> {
    async fn get(&self, link: &Link) -> BlockResult<Block> {
        let mut last_err = None;
        for fetcher in &self.fetchers {
            match fetcher.get(link).await {
                Ok(block) => return Ok(block),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or(crate::error::BlockError::NotFound(*link)))
    }
}

/// Adapts a borrowed `&dyn Fetcher` so it can be wrapped in an `Arc` and
/// tiered alongside owned fetchers.
pub struct RefFetcher<'a>(pub &'a dyn Fetcher);

#[async_trait]
impl<'a> Fetcher for RefFetcher<'a> {
    async fn get(&self, link: &Link) -> BlockResult<Block> {
        self.0.get(link).await
    }
}
