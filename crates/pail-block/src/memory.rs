//! Concurrent-safe, in-memory blockstore. Used both as a test fixture and as
//! the CRDT layer's transient overlay during a multi-step mutation.

use async_trait::async_trait;
use dashmap::DashMap;
use pail_core::Link;

use crate::block::Block;
use crate::error::{BlockError, BlockResult};
use crate::fetcher::Fetcher;

#[derive(Default)]
pub struct MapBlockstore {
    blocks: DashMap<Link, Block>,
}

impl MapBlockstore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, block: Block) {
        self.blocks.insert(*block.link(), block);
    }

    pub fn delete(&self, link: &Link) {
        self.blocks.remove(link);
    }

    pub fn contains(&self, link: &Link) -> bool {
        self.blocks.contains_key(link)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All links currently stored. Order is unspecified.
    pub fn links(&self) -> Vec<Link> {
        self.blocks.iter().map(|e| *e.key()).collect()
    }
}

#[async_trait]
impl Fetcher for MapBlockstore {
    async fn get(&self, link: &Link) -> BlockResult<Block> {
        self.blocks
            .get(link)
            .map(|e| e.value().clone())
            .ok_or(BlockError::NotFound(*link))
    }
}
