//! `advance` and causal `contains` over the event DAG (§4.F).

use std::collections::{HashSet, VecDeque};

use pail_block::Fetcher as BlockFetcher;
use pail_core::Link;

use crate::error::ClockResult;
use crate::event::EventBinder;
use crate::fetcher::EventFetcher;

/// Does event `a` causally contain event `b` (is `b` reachable from `a` via
/// `parents`)? Breadth-first, with the cycle-avoidance pruning rule: a link
/// that is itself one of `b`'s parents cannot lead to `b` without a cycle,
/// so it is skipped rather than expanded.
pub async fn contains<T>(
    events: &EventFetcher<'_, T>,
    a: &Link,
    b: &Link,
) -> ClockResult<bool> {
    if a == b {
        return Ok(true);
    }

    let (a_block, b_block) = tokio::try_join!(events.get(a), events.get(b))?;
    let b_parents = b_block.value().parents().to_vec();

    let mut queue: VecDeque<Link> = a_block.value().parents().iter().copied().collect();
    let mut seen = HashSet::new();

    while let Some(link) = queue.pop_front() {
        if &link == b {
            return Ok(true);
        }
        if b_parents.contains(&link) {
            continue;
        }
        if !seen.insert(link) {
            continue;
        }
        let parent_block = events.get(&link).await?;
        queue.extend(parent_block.value().parents().iter().copied());
    }

    Ok(false)
}

/// Update `head` with a newly-observed event link (§4.F).
pub async fn advance<T>(
    blocks: &dyn BlockFetcher,
    binder: &dyn EventBinder<T>,
    head: Vec<Link>,
    event: Link,
) -> ClockResult<Vec<Link>> {
    if head.contains(&event) {
        return Ok(head);
    }

    let events = EventFetcher::new(blocks, binder);

    let mut survivors = Vec::with_capacity(head.len());
    let mut changed = false;
    for h in &head {
        if contains(&events, &event, h).await? {
            changed = true;
        } else {
            survivors.push(*h);
        }
    }
    if changed {
        survivors.push(event);
        tracing::debug!(old_head = head.len(), new_head = survivors.len(), "clock advanced");
        return Ok(survivors);
    }

    for h in &head {
        if contains(&events, h, &event).await? {
            return Ok(head);
        }
    }

    let mut new_head = head;
    new_head.push(event);
    tracing::debug!(new_head = new_head.len(), "clock advanced (new head appended)");
    Ok(new_head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{encode_block, Event};
    use ciborium::value::Value as CborValue;
    use pail_block::MapBlockstore;

    struct UnitBinder;

    impl EventBinder<()> for UnitBinder {
        fn bind(&self, _node: &CborValue) -> ClockResult<()> {
            Ok(())
        }
        fn unbind(&self, _data: &()) -> ClockResult<CborValue> {
            Ok(CborValue::Null)
        }
    }

    fn put_event(store: &MapBlockstore, parents: Vec<Link>) -> Link {
        let block = encode_block(Event::new((), parents), &UnitBinder).unwrap();
        let link = *block.link();
        store.put(block.into_block());
        link
    }

    #[tokio::test]
    async fn advance_with_event_already_in_head_is_idempotent() {
        let store = MapBlockstore::new();
        let genesis = put_event(&store, vec![]);
        let head = vec![genesis];

        let new_head = advance(&store, &UnitBinder, head.clone(), genesis)
            .await
            .unwrap();
        assert_eq!(new_head, head);
    }

    #[tokio::test]
    async fn advance_with_descendant_replaces_ancestor() {
        let store = MapBlockstore::new();
        let genesis = put_event(&store, vec![]);
        let child = put_event(&store, vec![genesis]);

        let new_head = advance(&store, &UnitBinder, vec![genesis], child)
            .await
            .unwrap();
        assert_eq!(new_head, vec![child]);
    }

    #[tokio::test]
    async fn advance_with_ancestor_is_a_no_op() {
        let store = MapBlockstore::new();
        let genesis = put_event(&store, vec![]);
        let child = put_event(&store, vec![genesis]);

        let new_head = advance(&store, &UnitBinder, vec![child], genesis)
            .await
            .unwrap();
        assert_eq!(new_head, vec![child]);
    }

    #[tokio::test]
    async fn advance_with_concurrent_event_appends_to_head() {
        let store = MapBlockstore::new();
        let genesis = put_event(&store, vec![]);
        let a = put_event(&store, vec![genesis]);
        let b = put_event(&store, vec![genesis]);

        let new_head = advance(&store, &UnitBinder, vec![a], b).await.unwrap();
        assert_eq!(new_head.len(), 2);
        assert!(new_head.contains(&a) && new_head.contains(&b));
    }

    #[tokio::test]
    async fn contains_detects_direct_ancestor() {
        let store = MapBlockstore::new();
        let genesis = put_event(&store, vec![]);
        let child = put_event(&store, vec![genesis]);
        let events = EventFetcher::new(&store, &UnitBinder);

        assert!(contains(&events, &child, &genesis).await.unwrap());
        assert!(!contains(&events, &genesis, &child).await.unwrap());
    }
}
