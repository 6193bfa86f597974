//! pail-core - CID construction and DAG-CBOR primitives shared across the
//! pail workspace: a content-addressed, prefix-sharded key to link map with
//! a Merkle-clock CRDT overlay.

pub mod cbor;
pub mod error;

pub use cbor::*;
pub use error::*;
