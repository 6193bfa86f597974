//! The prefix-splitting, shard-collapsing trie engine: `put`/`get`/`del`/
//! `entries`/`traverse` (§4.D).

use std::future::Future;
use std::pin::Pin;

use pail_block::Fetcher as BlockFetcher;
use pail_core::Link;

use crate::constants::{is_printable_ascii, KEY_CHARS_ASCII};
use crate::error::{ShardError, ShardResult};
use crate::fetcher::ShardFetcher;
use crate::put_entry::put_entry;
use crate::shard::{encode_block, Shard, ShardBlock};
use crate::value::{Entry, Value};

/// Blocks to add to storage, and blocks superseded by the operation. Neither
/// list is ordered; callers apply them as a set.
#[derive(Debug, Clone, Default)]
pub struct Diff {
    pub additions: Vec<ShardBlock>,
    pub removals: Vec<ShardBlock>,
}

impl Diff {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_path(additions: Vec<ShardBlock>, removals: Vec<ShardBlock>) -> Self {
        Self {
            additions,
            removals,
        }
    }
}

/// Walk from `shard_block` toward the shard that contains or would contain
/// `key`, returning the path of shards from root to target inclusive (§4.D.2).
pub fn traverse<'a>(
    shards: &'a ShardFetcher<'a>,
    shard_block: ShardBlock,
    key: &'a str,
) -> Pin<Box<dyn Future<Output = ShardResult<Vec<ShardBlock>>> + 'a>> {
    Box::pin(async move {
        for entry in shard_block.value().entries() {
            let k = entry.key_suffix();
            if key == k {
                break;
            }
            if key.starts_with(k) {
                if let Some(child_link) = entry.value().shard_link() {
                    let child = shards.get(&child_link).await?;
                    let remaining = &key[k.len()..];
                    let mut path = vec![shard_block];
                    let mut rest = traverse(shards, child, remaining).await?;
                    path.append(&mut rest);
                    return Ok(path);
                }
            }
        }
        Ok(vec![shard_block])
    })
}

/// Fetch the value stored at `key` (§4.D.1).
pub async fn get(blocks: &dyn BlockFetcher, root: &Link, key: &str) -> ShardResult<Link> {
    let shards = ShardFetcher::new(blocks);
    let rshard = shards.get_root(root).await?;
    let path = traverse(&shards, rshard, key).await?;
    let target = path.last().expect("traverse always returns at least one shard");
    let skey = &key[target.value().prefix().len()..];
    target
        .value()
        .entries()
        .iter()
        .find(|e| e.key_suffix() == skey)
        .and_then(|e| e.value().value_link())
        .ok_or_else(|| ShardError::NotFound(key.to_string()))
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.as_bytes()
        .iter()
        .zip(b.as_bytes())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Validate key-shape preconditions against the root header (§4.D.3).
fn validate_key(root_shard: &Shard, key: &str) -> ShardResult<()> {
    let header = root_shard
        .root_header()
        .expect("root shard always carries a header");
    if header.key_chars != KEY_CHARS_ASCII {
        return Err(ShardError::UnsupportedKeyChars(header.key_chars.clone()));
    }
    if !is_printable_ascii(key) {
        return Err(ShardError::NonPrintableKey(key.to_string()));
    }
    if key.len() as i64 > header.max_key_size {
        return Err(ShardError::KeyTooLong {
            key: key.to_string(),
            max: header.max_key_size,
        });
    }
    Ok(())
}

/// Rewrite the shard CID stored in each ancestor's linking entry, walking
/// from `path[idx - 1]` up to the root, after `child` replaced the shard
/// that used to live at `path[idx]`.
fn propagate_up(
    path: &[ShardBlock],
    mut idx: usize,
    mut current: ShardBlock,
    additions: &mut Vec<ShardBlock>,
) -> ShardResult<ShardBlock> {
    while idx > 0 {
        idx -= 1;
        let parent = &path[idx];
        let child_key = &current.value().prefix()[parent.value().prefix().len()..];

        let mut ents = parent.value().entries().to_vec();
        let pos = ents
            .iter()
            .position(|e| e.key_suffix() == child_key)
            .ok_or_else(|| {
                ShardError::InvariantViolated(format!(
                    "\"{child_key}\" not found in parent {}",
                    parent.link()
                ))
            })?;
        if ents[pos].value().shard_link().is_none() {
            return Err(ShardError::InvariantViolated(format!(
                "\"{child_key}\" is not a shard link in {}",
                parent.link()
            )));
        }
        ents[pos] = Entry::new(
            child_key,
            Value::new(ents[pos].value().value_link(), Some(*current.link())),
        );

        let nshard = Shard::at_prefix(parent.value().prefix(), ents);
        current = encode_block(nshard)?;
        additions.push(current.clone());
    }
    Ok(current)
}

/// Put a value (a link) for the given key. If the key exists its value is
/// overwritten (§4.D.3).
pub async fn put(
    blocks: &dyn BlockFetcher,
    root: &Link,
    key: &str,
    value: Link,
) -> ShardResult<(Link, Diff)> {
    tracing::trace!(root = %root, key, "put");
    let shards = ShardFetcher::new(blocks);
    let rshard = shards.get_root(root).await?;
    validate_key(rshard.value(), key)?;

    let path = traverse(&shards, rshard, key).await?;
    let target = path.last().unwrap().clone();
    let skey = key[target.value().prefix().len()..].to_string();

    let mut final_entry = Entry::new(skey.clone(), Value::leaf(value));
    let mut target_entries = target.value().entries().to_vec();
    let mut additions: Vec<ShardBlock> = Vec::new();

    let mut split_at = None;
    for (i, e) in target_entries.iter().enumerate() {
        let k = e.key_suffix();
        if k == skey {
            break; // pure replace, handled by put_entry below - no split.
        }
        if common_prefix_len(k, &skey) > 0 {
            split_at = Some(i);
            break;
        }
    }

    if let Some(i) = split_at {
        let collided = target_entries[i].clone();
        let k = collided.key_suffix().to_string();
        let v = collided.value();
        let common_len = common_prefix_len(&k, &skey);
        let common = skey[..common_len].to_string();

        let mut child_entries = Vec::new();
        if common != skey {
            child_entries = put_entry(
                &child_entries,
                Entry::new(skey[common_len..].to_string(), Value::leaf(value)),
            );
        }
        if common != k {
            child_entries = put_entry(&child_entries, Entry::new(k[common_len..].to_string(), v));
        }

        let child_prefix = format!("{}{}", target.value().prefix(), common);
        let mut child = encode_block(Shard::at_prefix(child_prefix, child_entries))?;
        additions.push(child.clone());

        for wrap_len in (1..common.len()).rev() {
            let parent_prefix = format!("{}{}", target.value().prefix(), &common[..wrap_len]);
            let parent_value = if wrap_len == common.len() - 1 && common == k {
                if v.shard_link().is_some() {
                    return Err(ShardError::InvariantViolated(
                        "found a shard link when expecting a value".into(),
                    ));
                }
                Value::new(v.value_link(), Some(*child.link()))
            } else if wrap_len == common.len() - 1 && common == skey {
                Value::new(Some(value), Some(*child.link()))
            } else {
                Value::branch(*child.link())
            };

            let wrap_char = &common[wrap_len..wrap_len + 1];
            let parent = encode_block(Shard::at_prefix(
                parent_prefix,
                vec![Entry::new(wrap_char, parent_value)],
            ))?;
            additions.push(parent.clone());
            child = parent;
        }

        target_entries.remove(i);

        let top_char = &common[0..1];
        final_entry = if common.len() == 1 && common == k {
            if v.shard_link().is_some() {
                return Err(ShardError::InvariantViolated(
                    "found a shard link when expecting a value".into(),
                ));
            }
            Entry::new(top_char, Value::new(v.value_link(), Some(*child.link())))
        } else if common.len() == 1 && common == skey {
            Entry::new(top_char, Value::new(Some(value), Some(*child.link())))
        } else {
            Entry::new(top_char, Value::branch(*child.link()))
        };
    }

    let nshard = Shard::at_prefix(
        target.value().prefix(),
        put_entry(&target_entries, final_entry),
    );
    let child = encode_block(nshard)?;

    // pure no-op replace: nothing changed.
    if child.link() == target.link() {
        return Ok((*root, Diff::empty()));
    }

    additions.push(child.clone());
    let idx = path.len() - 1;
    let new_root = propagate_up(&path, idx, child, &mut additions)?;

    Ok((
        *new_root.link(),
        Diff::from_path(additions, path),
    ))
}

/// Delete the value for the given key. If the key is not found, or names an
/// intermediate (shard-only) entry, returns [`ShardError::NotFound`] (§4.D.5).
pub async fn del(blocks: &dyn BlockFetcher, root: &Link, key: &str) -> ShardResult<(Link, Diff)> {
    tracing::trace!(root = %root, key, "del");
    let shards = ShardFetcher::new(blocks);
    let rshard = shards.get_root(root).await?;

    let path = traverse(&shards, rshard, key).await?;
    let target = path.last().unwrap().clone();
    let skey = &key[target.value().prefix().len()..];

    let entry_idx = target
        .value()
        .entries()
        .iter()
        .position(|e| e.key_suffix() == skey)
        .ok_or_else(|| ShardError::NotFound(key.to_string()))?;
    let entry = target.value().entries()[entry_idx].clone();
    if entry.value().value_link().is_none() {
        return Err(ShardError::NotFound(key.to_string()));
    }

    let mut additions = Vec::new();
    let mut idx = path.len() - 1;

    let (new_target, entry_fully_removed) = if let Some(shard_link) = entry.value().shard_link() {
        let mut ents = target.value().entries().to_vec();
        ents[entry_idx] = Entry::new(entry.key_suffix(), Value::branch(shard_link));
        (Shard::at_prefix(target.value().prefix(), ents), false)
    } else {
        let mut ents = target.value().entries().to_vec();
        ents.remove(entry_idx);
        (Shard::at_prefix(target.value().prefix(), ents), true)
    };

    let mut current = encode_block(new_target)?;
    additions.push(current.clone());

    if entry_fully_removed {
        while current.value().entries().is_empty() && idx > 0 {
            idx -= 1;
            let parent = &path[idx];
            let child_link = *current.link();
            let ents: Vec<Entry> = parent
                .value()
                .entries()
                .iter()
                .filter_map(|e| {
                    if e.value().shard_link() != Some(child_link) {
                        return Some(e.clone());
                    }
                    // the child shard vanished; if this entry also carried a
                    // direct value, keep the entry but drop the dead shard link
                    // rather than losing that value (see shard_link removal
                    // rule in §4.D.5).
                    e.value()
                        .value_link()
                        .map(|v| Entry::new(e.key_suffix(), Value::leaf(v)))
                })
                .collect();
            current = encode_block(Shard::at_prefix(parent.value().prefix(), ents))?;
            additions.push(current.clone());
        }
    }

    let new_root = propagate_up(&path, idx, current, &mut additions)?;

    Ok((*new_root.link(), Diff::from_path(additions, path)))
}

/// Bounds/prefix filters for [`entries`] (§4.D.6).
#[derive(Debug, Clone, Default)]
pub struct EntriesOptions {
    pub prefix: Option<String>,
    pub gt: Option<String>,
    pub gte: Option<String>,
    pub lt: Option<String>,
    pub lte: Option<String>,
}

impl EntriesOptions {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
    pub fn with_gt(mut self, gt: impl Into<String>) -> Self {
        self.gt = Some(gt.into());
        self
    }
    pub fn with_gte(mut self, gte: impl Into<String>) -> Self {
        self.gte = Some(gte.into());
        self
    }
    pub fn with_lt(mut self, lt: impl Into<String>) -> Self {
        self.lt = Some(lt.into());
        self
    }
    pub fn with_lte(mut self, lte: impl Into<String>) -> Self {
        self.lte = Some(lte.into());
        self
    }
}

fn accepts(fqk: &str, opts: &EntriesOptions) -> bool {
    if let Some(prefix) = &opts.prefix {
        if !fqk.starts_with(prefix.as_str()) {
            return false;
        }
    }
    if let Some(gt) = &opts.gt {
        if fqk <= gt.as_str() {
            return false;
        }
    }
    if let Some(gte) = &opts.gte {
        if fqk < gte.as_str() {
            return false;
        }
    }
    if let Some(lt) = &opts.lt {
        if fqk >= lt.as_str() {
            return false;
        }
    }
    if let Some(lte) = &opts.lte {
        if fqk > lte.as_str() {
            return false;
        }
    }
    true
}

fn truncate(s: &str, len: usize) -> &str {
    let len = len.min(s.len());
    &s[..len]
}

fn could_descend(fqk: &str, opts: &EntriesOptions) -> bool {
    if let Some(prefix) = &opts.prefix {
        if !(fqk.starts_with(prefix.as_str()) || prefix.starts_with(fqk)) {
            return false;
        }
    }
    if let Some(gt) = &opts.gt {
        let l = fqk.len().min(gt.len());
        if truncate(fqk, l) < truncate(gt, l) {
            return false;
        }
    }
    if let Some(gte) = &opts.gte {
        let l = fqk.len().min(gte.len());
        if truncate(fqk, l) < truncate(gte, l) {
            return false;
        }
    }
    if let Some(lt) = &opts.lt {
        let l = fqk.len().min(lt.len());
        if truncate(fqk, l) > truncate(lt, l) {
            return false;
        }
    }
    if let Some(lte) = &opts.lte {
        let l = fqk.len().min(lte.len());
        if truncate(fqk, l) > truncate(lte, l) {
            return false;
        }
    }
    true
}

fn collect_entries<'a>(
    shards: &'a ShardFetcher<'a>,
    shard_block: ShardBlock,
    opts: &'a EntriesOptions,
    out: &'a mut Vec<(String, Link)>,
) -> Pin<Box<dyn Future<Output = ShardResult<()>> + 'a>> {
    Box::pin(async move {
        for entry in shard_block.value().entries() {
            let fqk = format!("{}{}", shard_block.value().prefix(), entry.key_suffix());

            if let Some(value_link) = entry.value().value_link() {
                if accepts(&fqk, opts) {
                    out.push((fqk.clone(), value_link));
                }
            }

            if let Some(shard_link) = entry.value().shard_link() {
                if could_descend(&fqk, opts) {
                    let child = shards.get(&shard_link).await?;
                    collect_entries(shards, child, opts, out).await?;
                }
            }
        }
        Ok(())
    })
}

/// In-order traversal of `(fully-qualified key, value link)` pairs, ascending
/// lexicographically, optionally filtered by `opts` (§4.D.6).
pub async fn entries(
    blocks: &dyn BlockFetcher,
    root: &Link,
    opts: EntriesOptions,
) -> ShardResult<Vec<(String, Link)>> {
    let shards = ShardFetcher::new(blocks);
    let rshard = shards.get_root(root).await?;
    let mut out = Vec::new();
    collect_entries(&shards, rshard, &opts, &mut out).await?;
    Ok(out)
}
