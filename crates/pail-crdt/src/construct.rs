//! Construction helpers for a brand-new pail (original: `construct.go`).

use pail_core::Link;
use pail_shard::{encode_block, Shard, ShardError};

/// Encode and hash an empty [`Shard::new_root`], the starting trie root for
/// a brand-new map. The caller must persist the returned block before using
/// the link (e.g. S1's `Put(∅, "test", v)` starts here).
pub fn empty_root() -> Result<(Link, pail_block::Block), ShardError> {
    let block = encode_block(Shard::new_root(vec![]))?;
    Ok((*block.link(), block.into_block()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root_is_deterministic() {
        let (a, _) = empty_root().unwrap();
        let (b, _) = empty_root().unwrap();
        assert_eq!(a, b);
    }
}
