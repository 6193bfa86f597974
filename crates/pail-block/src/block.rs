//! A block is an immutable `(link, bytes)` pair: `link = cid(sha256(bytes), dag-cbor)`.

use pail_core::Link;

use crate::error::BlockResult;

/// Raw content-addressed bytes plus their link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    link: Link,
    bytes: Vec<u8>,
}

impl Block {
    /// Wrap already-hashed `(link, bytes)`. The caller is trusted to have
    /// computed `link` correctly; use [`Block::seal`] to compute it instead.
    pub fn new(link: Link, bytes: Vec<u8>) -> Self {
        Self { link, bytes }
    }

    /// Hash `bytes` and wrap the result as a block.
    pub fn seal(bytes: Vec<u8>) -> BlockResult<Self> {
        let link = pail_core::hash_block(&bytes)?;
        Ok(Self { link, bytes })
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// A block paired with its already-decoded value, so callers that just
/// traversed a shard/event don't have to re-decode it to get at the bytes
/// or link again.
#[derive(Debug, Clone)]
pub struct BlockView<T> {
    block: Block,
    value: T,
}

impl<T> BlockView<T> {
    pub fn new(link: Link, bytes: Vec<u8>, value: T) -> Self {
        Self {
            block: Block::new(link, bytes),
            value,
        }
    }

    pub fn link(&self) -> &Link {
        self.block.link()
    }

    pub fn bytes(&self) -> &[u8] {
        self.block.bytes()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn as_block(&self) -> &Block {
        &self.block
    }

    pub fn into_block(self) -> Block {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_computes_link() {
        let block = Block::seal(b"hello".to_vec()).unwrap();
        assert_eq!(block.link(), &pail_core::hash_block(b"hello").unwrap());
    }
}
