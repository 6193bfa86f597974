//! Deterministic DAG-CBOR encode/decode.
//!
//! Shard, event and operation wire types hand-assemble a [`ciborium::value::Value`]
//! tree instead of deriving `Serialize`, so that field order (semantic for the
//! block hash, per the CBOR layouts) and the tag-42 link encoding are explicit.

use cid::Cid;
use ciborium::value::Value;
use multihash::Multihash;
use sha2::{Digest, Sha256};

use crate::error::{PailError, PailResult};

/// DAG-CBOR multicodec code.
pub const DAG_CBOR_CODE: u64 = 0x71;
/// SHA2-256 multihash code.
pub const SHA256_CODE: u64 = 0x12;
/// CBOR tag used by DAG-CBOR to mark a binary CID (IPLD link).
pub const CBOR_LINK_TAG: u64 = 42;

/// Content identifier for an immutable block. A plain alias over [`cid::Cid`] —
/// equality is the CID's byte-equality, and the `Display` impl already renders
/// the standard base32 multibase form for a CIDv1.
pub type Link = Cid;

/// Compute the SHA2-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash `bytes` (the CBOR encoding of a block) and wrap it as a CIDv1
/// DAG-CBOR link, per `link = cid(sha256(bytes), dag-cbor)`.
pub fn hash_block(bytes: &[u8]) -> PailResult<Link> {
    let digest = sha256(bytes);
    let mh = Multihash::<64>::wrap(SHA256_CODE, &digest)
        .map_err(|e| PailError::Cid(e.to_string()))?;
    Ok(Cid::new_v1(DAG_CBOR_CODE, mh))
}

/// Serialize a [`Value`] tree to DAG-CBOR bytes.
pub fn encode(value: &Value) -> PailResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(|e| PailError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Parse DAG-CBOR bytes into a [`Value`] tree.
pub fn decode(bytes: &[u8]) -> PailResult<Value> {
    ciborium::from_reader(bytes).map_err(|e| PailError::Decode(e.to_string()))
}

/// Encode `link` as a DAG-CBOR tag-42 node: `tag(42, 0x00 || cid-bytes)`.
pub fn link_to_value(link: &Link) -> Value {
    let cid_bytes = link.to_bytes();
    let mut bytes = Vec::with_capacity(1 + cid_bytes.len());
    bytes.push(0x00);
    bytes.extend_from_slice(&cid_bytes);
    Value::Tag(CBOR_LINK_TAG, Box::new(Value::Bytes(bytes)))
}

/// Decode a DAG-CBOR tag-42 node back into a [`Link`].
pub fn value_to_link(value: &Value) -> PailResult<Link> {
    match value {
        Value::Tag(CBOR_LINK_TAG, inner) => match inner.as_ref() {
            Value::Bytes(bytes) if !bytes.is_empty() && bytes[0] == 0x00 => {
                Cid::try_from(&bytes[1..]).map_err(|e| PailError::MalformedLink(e.to_string()))
            }
            _ => Err(PailError::MalformedLink(
                "tag-42 node did not wrap an identity-prefixed CID".into(),
            )),
        },
        _ => Err(PailError::MalformedLink("expected a tag-42 link node".into())),
    }
}

/// Convenience: serialize a [`Value`], hash it, and return the resulting
/// `(link, bytes)` pair as if committing a new block.
pub fn seal(value: &Value) -> PailResult<(Link, Vec<u8>)> {
    let bytes = encode(value)?;
    let link = hash_block(&bytes)?;
    Ok((link, bytes))
}
