use crate::value::{Entry, Value};

/// The only mutator of an entry list - returns a new list preserving sort
/// order and key uniqueness (§4.C).
pub fn put_entry(target: &[Entry], new_entry: Entry) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(target.len() + 1);

    for (i, entry) in target.iter().enumerate() {
        let k = entry.key_suffix();
        let v = entry.value();

        if new_entry.key_suffix() == k {
            let merged = if new_entry.value().shard_link().is_some() {
                // new value carries a shard link.
                if v.shard_link().is_some()
                    && v.value_link().is_some()
                    && new_entry.value().value_link().is_none()
                {
                    // old entry carried both, new carries no value: preserve the
                    // old data link, adopt the new shard link.
                    Entry::new(k, Value::new(v.value_link(), new_entry.value().shard_link()))
                } else {
                    new_entry.clone()
                }
            } else if v.shard_link().is_some() {
                // new value has no shard link but old did: preserve old shard link.
                Entry::new(k, Value::new(new_entry.value().value_link(), v.shard_link()))
            } else {
                new_entry.clone()
            };
            entries.push(merged);
            entries.extend_from_slice(&target[i + 1..]);
            return entries;
        }

        if i == 0 && new_entry.key_suffix() < k {
            entries.push(new_entry);
            entries.extend_from_slice(&target[i..]);
            return entries;
        }

        if i > 0 && new_entry.key_suffix() > target[i - 1].key_suffix() && new_entry.key_suffix() < k
        {
            entries.push(new_entry);
            entries.extend_from_slice(&target[i..]);
            return entries;
        }

        entries.push(entry.clone());
    }

    entries.push(new_entry);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use pail_core::hash_block;

    fn link(n: u8) -> pail_core::Link {
        hash_block(&[n]).unwrap()
    }

    #[test]
    fn inserts_in_sorted_position() {
        let target = vec![
            Entry::new("a", Value::leaf(link(1))),
            Entry::new("c", Value::leaf(link(2))),
        ];
        let result = put_entry(&target, Entry::new("b", Value::leaf(link(3))));
        let keys: Vec<&str> = result.iter().map(|e| e.key_suffix()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn inserts_before_first() {
        let target = vec![Entry::new("b", Value::leaf(link(1)))];
        let result = put_entry(&target, Entry::new("a", Value::leaf(link(2))));
        let keys: Vec<&str> = result.iter().map(|e| e.key_suffix()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn appends_after_last() {
        let target = vec![Entry::new("a", Value::leaf(link(1)))];
        let result = put_entry(&target, Entry::new("b", Value::leaf(link(2))));
        let keys: Vec<&str> = result.iter().map(|e| e.key_suffix()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn replace_preserves_old_shard_when_new_has_no_value() {
        let shard = link(9);
        let old_value = link(1);
        let target = vec![Entry::new("a", Value::new(Some(old_value), Some(shard)))];
        let new_shard = link(8);
        let result = put_entry(
            &target,
            Entry::new("a", Value::new(None, Some(new_shard))),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value().value_link(), Some(old_value));
        assert_eq!(result[0].value().shard_link(), Some(new_shard));
    }

    #[test]
    fn replace_preserves_old_shard_when_new_has_no_shard() {
        let shard = link(9);
        let target = vec![Entry::new("a", Value::new(Some(link(1)), Some(shard)))];
        let new_value = link(5);
        let result = put_entry(&target, Entry::new("a", Value::leaf(new_value)));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value().value_link(), Some(new_value));
        assert_eq!(result[0].value().shard_link(), Some(shard));
    }
}
