use pail_block::Fetcher as BlockFetcher;
use pail_core::Link;

use crate::error::ShardResult;
use crate::shard::{decode_block, ShardBlock};

/// Bundles a block [`BlockFetcher`] with shard decoding, so the trie engine
/// doesn't repeat fetch-then-decode boilerplate at every call site.
pub struct ShardFetcher<'a> {
    blocks: &'a dyn BlockFetcher,
}

impl<'a> ShardFetcher<'a> {
    pub fn new(blocks: &'a dyn BlockFetcher) -> Self {
        Self { blocks }
    }

    pub async fn get(&self, link: &Link) -> ShardResult<ShardBlock> {
        let block = self.blocks.get(link).await?;
        decode_block(block)
    }

    /// Fetch and decode the root shard, failing the way `put`/`del` expect
    /// when the link does not actually point at a root shard.
    pub async fn get_root(&self, link: &Link) -> ShardResult<ShardBlock> {
        let view = self.get(link).await?;
        if !view.value().is_root() {
            return Err(crate::error::ShardError::Decode(
                "link does not point at a root shard".into(),
            ));
        }
        Ok(view)
    }
}
