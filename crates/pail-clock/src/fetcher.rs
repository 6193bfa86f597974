use pail_block::Fetcher as BlockFetcher;
use pail_core::Link;

use crate::error::ClockResult;
use crate::event::{decode_block, EventBinder, EventBlock};

/// Bundles a [`BlockFetcher`] with event decoding, the way [`crate::EventBinder`]
/// callers otherwise would repeat at every call site.
pub struct EventFetcher<'a, T> {
    blocks: &'a dyn BlockFetcher,
    binder: &'a dyn EventBinder<T>,
}

impl<'a, T> EventFetcher<'a, T> {
    pub fn new(blocks: &'a dyn BlockFetcher, binder: &'a dyn EventBinder<T>) -> Self {
        Self { blocks, binder }
    }

    pub async fn get(&self, link: &Link) -> ClockResult<EventBlock<T>> {
        let block = self.blocks.get(link).await?;
        decode_block(block, self.binder)
    }
}
