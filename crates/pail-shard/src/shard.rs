use ciborium::value::Value as CborValue;
use pail_block::{Block, BlockView};
use pail_core::Link;

use crate::constants::{KEY_CHARS_ASCII, MAX_KEY_SIZE, VERSION};
use crate::error::{ShardError, ShardResult};
use crate::value::{Entry, Value};

/// Header fields only the root shard (`prefix == ""`) carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootHeader {
    pub version: i64,
    pub key_chars: String,
    pub max_key_size: i64,
}

impl Default for RootHeader {
    fn default() -> Self {
        Self {
            version: VERSION,
            key_chars: KEY_CHARS_ASCII.to_string(),
            max_key_size: MAX_KEY_SIZE,
        }
    }
}

/// A node of the prefix trie. The root shard additionally carries a
/// [`RootHeader`]; non-root shards leave it `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    prefix: String,
    entries: Vec<Entry>,
    root: Option<RootHeader>,
}

impl Shard {
    pub fn new(prefix: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            prefix: prefix.into(),
            entries,
            root: None,
        }
    }

    pub fn new_root(entries: Vec<Entry>) -> Self {
        Self {
            prefix: String::new(),
            entries,
            root: Some(RootHeader::default()),
        }
    }

    /// Build a shard at `prefix`, carrying the root header when `prefix` is
    /// empty (mirrors the original's rule that the root is simply the shard
    /// whose prefix is `""`).
    pub fn at_prefix(prefix: impl Into<String>, entries: Vec<Entry>) -> Self {
        let prefix = prefix.into();
        if prefix.is_empty() {
            Self::new_root(entries)
        } else {
            Self::new(prefix, entries)
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn root_header(&self) -> Option<&RootHeader> {
        self.root.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.root.is_some()
    }
}

/// A [`BlockView`] over a decoded [`Shard`].
pub type ShardBlock = BlockView<Shard>;

fn encode_value(value: Value) -> CborValue {
    match (value.shard_link(), value.value_link()) {
        (None, Some(value_link)) => pail_core::link_to_value(&value_link),
        (Some(shard_link), None) => {
            CborValue::Array(vec![pail_core::link_to_value(&shard_link)])
        }
        (Some(shard_link), Some(value_link)) => CborValue::Array(vec![
            pail_core::link_to_value(&shard_link),
            pail_core::link_to_value(&value_link),
        ]),
        (None, None) => unreachable!("Value invariant: at least one link present"),
    }
}

fn decode_value(node: &CborValue) -> ShardResult<Value> {
    if let Ok(link) = pail_core::value_to_link(node) {
        return Ok(Value::leaf(link));
    }
    match node {
        CborValue::Array(items) if items.len() == 1 => {
            let shard_link = pail_core::value_to_link(&items[0])
                .map_err(|e| ShardError::Decode(e.to_string()))?;
            Ok(Value::branch(shard_link))
        }
        CborValue::Array(items) if items.len() == 2 => {
            let shard_link = pail_core::value_to_link(&items[0])
                .map_err(|e| ShardError::Decode(e.to_string()))?;
            let value_link = pail_core::value_to_link(&items[1])
                .map_err(|e| ShardError::Decode(e.to_string()))?;
            Ok(Value::new(Some(value_link), Some(shard_link)))
        }
        _ => Err(ShardError::Decode("malformed shard value node".into())),
    }
}

fn encode_entry(entry: &Entry) -> CborValue {
    CborValue::Array(vec![
        CborValue::Text(entry.key_suffix().to_string()),
        encode_value(entry.value()),
    ])
}

fn decode_entry(node: &CborValue) -> ShardResult<Entry> {
    let items = match node {
        CborValue::Array(items) if items.len() == 2 => items,
        _ => return Err(ShardError::Decode("entry is not a 2-element list".into())),
    };
    let key = items[0]
        .as_text()
        .ok_or_else(|| ShardError::Decode("entry key is not a string".into()))?
        .to_string();
    let value = decode_value(&items[1])?;
    Ok(Entry::new(key, value))
}

/// Serialize a [`Shard`] to DAG-CBOR bytes, field order per §6.2.
pub fn marshal(shard: &Shard) -> ShardResult<Vec<u8>> {
    let mut fields = Vec::with_capacity(5);
    if let Some(root) = &shard.root {
        fields.push((
            CborValue::Text("version".into()),
            CborValue::Integer(root.version.into()),
        ));
        fields.push((
            CborValue::Text("keyChars".into()),
            CborValue::Text(root.key_chars.clone()),
        ));
        fields.push((
            CborValue::Text("maxKeySize".into()),
            CborValue::Integer(root.max_key_size.into()),
        ));
    }
    fields.push((
        CborValue::Text("prefix".into()),
        CborValue::Text(shard.prefix.clone()),
    ));
    fields.push((
        CborValue::Text("entries".into()),
        CborValue::Array(shard.entries.iter().map(encode_entry).collect()),
    ));
    pail_core::encode(&CborValue::Map(fields)).map_err(ShardError::from)
}

fn lookup<'a>(map: &'a [(CborValue, CborValue)], key: &str) -> ShardResult<&'a CborValue> {
    map.iter()
        .find(|(k, _)| k.as_text() == Some(key))
        .map(|(_, v)| v)
        .ok_or_else(|| ShardError::Decode(format!("missing field: {key}")))
}

/// Deserialize DAG-CBOR bytes to a [`Shard`]. Decodes either a root or
/// non-root shard depending on which fields are present; a root whose
/// `version` does not match [`crate::constants::VERSION`] is rejected.
pub fn unmarshal(bytes: &[u8]) -> ShardResult<Shard> {
    let node = pail_core::decode(bytes)?;
    let map = match &node {
        CborValue::Map(fields) => fields,
        _ => return Err(ShardError::Decode("shard is not a CBOR map".into())),
    };

    let prefix = lookup(map, "prefix")?
        .as_text()
        .ok_or_else(|| ShardError::Decode("prefix is not a string".into()))?
        .to_string();

    let entries_node = lookup(map, "entries")?;
    let entries = match entries_node {
        CborValue::Array(items) => items
            .iter()
            .map(decode_entry)
            .collect::<ShardResult<Vec<_>>>()?,
        _ => return Err(ShardError::Decode("entries is not a list".into())),
    };

    let root = if let Ok(version_node) = lookup(map, "version") {
        let version = version_node
            .as_integer()
            .and_then(|i| i64::try_from(i).ok())
            .ok_or_else(|| ShardError::Decode("version is not an integer".into()))?;
        if version != VERSION {
            return Err(ShardError::UnsupportedVersion(version));
        }
        let key_chars = lookup(map, "keyChars")?
            .as_text()
            .ok_or_else(|| ShardError::Decode("keyChars is not a string".into()))?
            .to_string();
        let max_key_size = lookup(map, "maxKeySize")?
            .as_integer()
            .and_then(|i| i64::try_from(i).ok())
            .ok_or_else(|| ShardError::Decode("maxKeySize is not an integer".into()))?;
        Some(RootHeader {
            version,
            key_chars,
            max_key_size,
        })
    } else {
        None
    };

    Ok(Shard {
        prefix,
        entries,
        root,
    })
}

/// Marshal `shard`, hash it, and wrap the result as a [`ShardBlock`].
pub fn encode_block(shard: Shard) -> ShardResult<ShardBlock> {
    let bytes = marshal(&shard)?;
    let link = pail_core::hash_block(&bytes)?;
    Ok(BlockView::new(link, bytes, shard))
}

/// Decode a previously-fetched [`Block`] into a [`ShardBlock`].
pub fn decode_block(block: Block) -> ShardResult<ShardBlock> {
    let shard = unmarshal(block.bytes())?;
    Ok(BlockView::new(*block.link(), block.into_bytes(), shard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pail_core::hash_block;

    fn link(n: u8) -> Link {
        hash_block(&[n]).unwrap()
    }

    #[test]
    fn root_shard_roundtrips() {
        let shard = Shard::new_root(vec![Entry::new("a", Value::leaf(link(1)))]);
        let bytes = marshal(&shard).unwrap();
        let decoded = unmarshal(&bytes).unwrap();
        assert_eq!(shard, decoded);
    }

    #[test]
    fn non_root_shard_roundtrips() {
        let shard = Shard::new(
            "aa",
            vec![Entry::new("bb", Value::new(Some(link(1)), Some(link(2))))],
        );
        let bytes = marshal(&shard).unwrap();
        let decoded = unmarshal(&bytes).unwrap();
        assert_eq!(shard, decoded);
    }

    #[test]
    fn cid_is_stable_across_reencode() {
        let shard = Shard::new_root(vec![Entry::new("k", Value::leaf(link(3)))]);
        let block1 = encode_block(shard.clone()).unwrap();
        let reencoded = unmarshal(block1.bytes()).unwrap();
        let block2 = encode_block(reencoded).unwrap();
        assert_eq!(block1.link(), block2.link());
        assert_eq!(block1.bytes(), block2.bytes());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut shard = Shard::new_root(vec![]);
        shard.root.as_mut().unwrap().version = 99;
        let bytes = marshal(&shard).unwrap();
        assert!(matches!(
            unmarshal(&bytes),
            Err(ShardError::UnsupportedVersion(99))
        ));
    }
}
