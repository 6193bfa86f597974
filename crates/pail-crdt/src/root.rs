//! `Root(fetcher, head)` — materialize the effective trie root for a head
//! set (§4.G.2): a single-event head is a pure lookup, a multi-event head is
//! resolved via common-ancestor search plus weighted, deterministic replay.

use std::collections::HashSet;
use std::sync::Arc;

use pail_block::{Fetcher as BlockFetcher, MapBlockstore, RefFetcher, TieredFetcher};
use pail_clock::EventFetcher;
use pail_core::Link;
use pail_shard::Diff;

use crate::error::{CrdtError, CrdtResult};
use crate::operation::{OpKind, Operation, OperationBinder};
use crate::ancestor::{find_common_ancestor, weighted_replay_order};

/// Drop blocks that appear in both `additions` and `removals` — an
/// add-then-remove (or remove-then-add) across the replayed history nets to
/// no observable change, so neither side should be handed to the caller.
fn cancel_matching_blocks(diff: &mut Diff) {
    let add_links: HashSet<Link> = diff.additions.iter().map(|b| *b.link()).collect();
    let rem_links: HashSet<Link> = diff.removals.iter().map(|b| *b.link()).collect();
    let cancelled: HashSet<Link> = add_links.intersection(&rem_links).copied().collect();
    if cancelled.is_empty() {
        return;
    }
    diff.additions.retain(|b| !cancelled.contains(b.link()));
    diff.removals.retain(|b| !cancelled.contains(b.link()));
}

/// Reconstruct the materialized trie root at `head` (§4.G.2). Empty heads
/// fail with [`CrdtError::HeadlessClock`]; a single-event head is `event
/// .data.root` with an empty diff (replay purity, §8 invariant 12); a
/// multi-event head finds the common ancestor and replays the intervening
/// events in weighted order against a transient overlay so later replay
/// steps can see shards minted by earlier ones.
pub async fn root(blocks: &dyn BlockFetcher, head: &[Link]) -> CrdtResult<(Link, Diff)> {
    if head.is_empty() {
        return Err(CrdtError::HeadlessClock);
    }

    let events: EventFetcher<'_, Operation> = EventFetcher::new(blocks, &OperationBinder);

    if head.len() == 1 {
        let event = events.get(&head[0]).await?;
        return Ok((event.value().data().root, Diff::empty()));
    }

    let ancestor = find_common_ancestor(&events, head).await?;
    let ancestor_event = events.get(&ancestor).await?;
    let mut current_root = ancestor_event.value().data().root;

    let order = weighted_replay_order(&events, head, &ancestor).await?;
    tracing::debug!(
        heads = head.len(),
        ancestor = %ancestor,
        replaying = order.len(),
        "reconstructing root for a multi-event head"
    );

    let overlay = MapBlockstore::new();
    let mut diff = Diff::empty();

    for link in order {
        let event = events.get(&link).await?;
        let op = event.value().data();

        let tiered = TieredFetcher::new(vec![
            Arc::new(RefFetcher(&overlay)) as Arc<dyn BlockFetcher + '_>,
            Arc::new(RefFetcher(blocks)) as Arc<dyn BlockFetcher + '_>,
        ]);

        let (new_root, step_diff) = apply(&tiered, &current_root, op).await?;
        for block in &step_diff.additions {
            overlay.put(block.as_block().clone());
        }
        current_root = new_root;
        diff.additions.extend(step_diff.additions);
        diff.removals.extend(step_diff.removals);
    }

    cancel_matching_blocks(&mut diff);
    Ok((current_root, diff))
}

async fn apply(
    blocks: &dyn BlockFetcher,
    root: &Link,
    op: &Operation,
) -> CrdtResult<(Link, Diff)> {
    match &op.kind {
        OpKind::Put => {
            let value = op
                .value
                .expect("decode enforces put operations carry a value");
            Ok(pail_shard::put(blocks, root, &op.key, value).await?)
        }
        OpKind::Del => Ok(pail_shard::del(blocks, root, &op.key).await?),
        OpKind::Unknown(kind) => Err(CrdtError::UnknownOperation(kind.clone())),
    }
}
