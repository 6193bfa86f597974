//! `Put`/`Del` over a head set (§4.G.1): compute the effective root, mutate
//! the trie, wrap the result in an event, and advance the clock.

use std::sync::Arc;

use pail_block::{Fetcher as BlockFetcher, MapBlockstore, RefFetcher, TieredFetcher};
use pail_clock::EventBlock;
use pail_core::Link;
use pail_shard::Diff;

use crate::error::CrdtResult;
use crate::operation::{Operation, OperationBinder};
use crate::root::root;

/// Bundles everything a `put`/`del` call produces (original: `crdt/
/// interface.go`'s `Result`): the diff to persist, the resulting trie root,
/// the updated head, and the event block to persist alongside it. `event` is
/// `None` for a no-op mutation (e.g. a put of an already-current value).
#[derive(Debug, Clone)]
pub struct MutationResult {
    pub diff: Diff,
    pub root: Link,
    pub head: Vec<Link>,
    pub event: Option<EventBlock<Operation>>,
}

async fn effective_root_tiered<'a>(
    blocks: &'a dyn BlockFetcher,
    overlay: &'a MapBlockstore,
    head: &[Link],
) -> CrdtResult<Link> {
    let tiered = TieredFetcher::new(vec![
        Arc::new(RefFetcher(overlay)) as Arc<dyn BlockFetcher + '_>,
        Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
    ]);
    let (current_root, root_diff) = root(&tiered, head).await?;
    for block in &root_diff.additions {
        overlay.put(block.as_block().clone());
    }
    Ok(current_root)
}

/// Put `value` for `key` against `head`. Runs the trie engine against a
/// transient overlay atop `blocks` so shards minted while reconstructing the
/// effective root (multi-head case) are visible to the mutation itself.
pub async fn put(
    blocks: &dyn BlockFetcher,
    head: Vec<Link>,
    key: &str,
    value: Link,
) -> CrdtResult<MutationResult> {
    let overlay = MapBlockstore::new();
    let current_root = effective_root_tiered(blocks, &overlay, &head).await?;

    let tiered = TieredFetcher::new(vec![
        Arc::new(RefFetcher(&overlay)) as Arc<dyn BlockFetcher + '_>,
        Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
    ]);
    let (new_root, trie_diff) = pail_shard::put(&tiered, &current_root, key, value).await?;

    if new_root == current_root {
        return Ok(MutationResult {
            diff: Diff::empty(),
            root: current_root,
            head,
            event: None,
        });
    }
    for block in &trie_diff.additions {
        overlay.put(block.as_block().clone());
    }

    finish_mutation(blocks, &overlay, head, Operation::put(new_root, key, value), new_root, trie_diff)
        .await
}

/// Delete `key` against `head`. Propagates [`pail_shard::ShardError::NotFound`]
/// (via [`crate::error::CrdtError`]) the way the trie engine does: there is
/// no silent no-op for a delete of an absent key (§8 invariant 6).
pub async fn del(blocks: &dyn BlockFetcher, head: Vec<Link>, key: &str) -> CrdtResult<MutationResult> {
    let overlay = MapBlockstore::new();
    let current_root = effective_root_tiered(blocks, &overlay, &head).await?;

    let tiered = TieredFetcher::new(vec![
        Arc::new(RefFetcher(&overlay)) as Arc<dyn BlockFetcher + '_>,
        Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
    ]);
    let (new_root, trie_diff) = pail_shard::del(&tiered, &current_root, key).await?;

    for block in &trie_diff.additions {
        overlay.put(block.as_block().clone());
    }

    finish_mutation(blocks, &overlay, head, Operation::del(new_root, key), new_root, trie_diff)
        .await
}

/// Wrap `op` in an event over `head`, advance the clock against an overlay
/// that can already see the just-minted (not-yet-persisted) event, and
/// bundle everything into a [`MutationResult`].
async fn finish_mutation(
    blocks: &dyn BlockFetcher,
    overlay: &MapBlockstore,
    head: Vec<Link>,
    op: Operation,
    new_root: Link,
    trie_diff: Diff,
) -> CrdtResult<MutationResult> {
    let event = pail_clock::encode_block(pail_clock::Event::new(op, head.clone()), &OperationBinder)?;
    tracing::debug!(event = %event.link(), parents = head.len(), "minted operation event");
    overlay.put(event.as_block().clone());

    let tiered = TieredFetcher::new(vec![
        Arc::new(RefFetcher(overlay)) as Arc<dyn BlockFetcher + '_>,
        Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
    ]);
    let new_head = pail_clock::advance(&tiered, &OperationBinder, head, *event.link()).await?;

    Ok(MutationResult {
        diff: trie_diff,
        root: new_root,
        head: new_head,
        event: Some(event),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pail_block::MapBlockstore;
    use pail_core::hash_block;
    use pail_shard::{encode_block, Shard};

    fn value_link(n: u8) -> Link {
        hash_block(&[n]).unwrap()
    }

    fn empty_pail(store: &MapBlockstore) -> Link {
        let block = encode_block(Shard::new_root(vec![])).unwrap();
        let link = *block.link();
        store.put(block.into_block());
        link
    }

    fn persist(store: &MapBlockstore, result: &MutationResult) {
        for block in &result.diff.additions {
            store.put(block.as_block().clone());
        }
        if let Some(event) = &result.event {
            store.put(event.as_block().clone());
        }
    }

    #[tokio::test]
    async fn first_put_mints_a_genesis_event() {
        let store = MapBlockstore::new();
        let empty = empty_pail(&store);
        let genesis = {
            let op = Operation::put(empty, "__genesis__", value_link(0));
            let block = encode_block(pail_clock::Event::new(op, vec![]), &OperationBinder).unwrap();
            let link = *block.link();
            store.put(block.into_block());
            link
        };

        let result = put(&store, vec![genesis], "hello", value_link(1)).await.unwrap();
        assert!(result.event.is_some());
        assert_eq!(result.head.len(), 1);
        persist(&store, &result);

        let got = pail_shard::get(&store, &result.root, "hello").await.unwrap();
        assert_eq!(got, value_link(1));
    }

    #[tokio::test]
    async fn put_of_identical_value_is_a_no_op() {
        let store = MapBlockstore::new();
        let empty = empty_pail(&store);
        let genesis = {
            let op = Operation::put(empty, "__genesis__", value_link(0));
            let block = encode_block(pail_clock::Event::new(op, vec![]), &OperationBinder).unwrap();
            let link = *block.link();
            store.put(block.into_block());
            link
        };

        let first = put(&store, vec![genesis], "hello", value_link(1)).await.unwrap();
        persist(&store, &first);

        let second = put(&store, first.head.clone(), "hello", value_link(1)).await.unwrap();
        assert!(second.event.is_none());
        assert!(second.diff.additions.is_empty());
        assert_eq!(second.root, first.root);
    }
}
