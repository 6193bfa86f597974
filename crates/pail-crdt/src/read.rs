//! `Get`/`Entries` over a head set (§4.G.4): resolve the effective root via
//! [`crate::root::root`], overlay its diff, then delegate to the trie engine.

use std::sync::Arc;

use pail_block::{Fetcher as BlockFetcher, MapBlockstore, RefFetcher, TieredFetcher};
use pail_core::Link;
use pail_shard::EntriesOptions;

use crate::error::CrdtResult;
use crate::root::root;

async fn effective_fetcher<'a>(
    blocks: &'a dyn BlockFetcher,
    overlay: &'a MapBlockstore,
    head: &[Link],
) -> CrdtResult<(Link, TieredFetcher<'a>)> {
    let probe = TieredFetcher::new(vec![
        Arc::new(RefFetcher(overlay)) as Arc<dyn BlockFetcher + '_>,
        Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
    ]);
    let (effective_root, diff) = root(&probe, head).await?;
    for block in &diff.additions {
        overlay.put(block.as_block().clone());
    }
    let tiered = TieredFetcher::new(vec![
        Arc::new(RefFetcher(overlay)) as Arc<dyn BlockFetcher + '_>,
        Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
    ]);
    Ok((effective_root, tiered))
}

/// Fetch the value stored at `key` as observed at `head`.
pub async fn get(blocks: &dyn BlockFetcher, head: &[Link], key: &str) -> CrdtResult<Link> {
    let overlay = MapBlockstore::new();
    let (effective_root, tiered) = effective_fetcher(blocks, &overlay, head).await?;
    Ok(pail_shard::get(&tiered, &effective_root, key).await?)
}

/// In-order `(fully-qualified key, value link)` pairs as observed at `head`.
pub async fn entries(
    blocks: &dyn BlockFetcher,
    head: &[Link],
    opts: EntriesOptions,
) -> CrdtResult<Vec<(String, Link)>> {
    let overlay = MapBlockstore::new();
    let (effective_root, tiered) = effective_fetcher(blocks, &overlay, head).await?;
    Ok(pail_shard::entries(&tiered, &effective_root, opts).await?)
}
