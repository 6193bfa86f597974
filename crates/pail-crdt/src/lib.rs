//! The CRDT layer: `put`/`del`/`get`/`entries` over a head set, built on top
//! of the sharded trie engine (`pail_shard`) and the Merkle clock
//! (`pail_clock`). A head converges deterministically across replicas that
//! have observed the same set of events, regardless of exchange order.

pub mod ancestor;
pub mod construct;
pub mod error;
pub mod mutate;
pub mod operation;
pub mod read;
pub mod root;

pub use ancestor::*;
pub use construct::*;
pub use error::*;
pub use mutate::*;
pub use operation::*;
pub use read::*;
pub use root::root;
