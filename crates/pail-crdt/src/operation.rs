//! The CRDT's event payload: `Operation = {root, type, key, value?}` (§6.2),
//! plus the concrete [`pail_clock::EventBinder`] that (de)serializes it.

use ciborium::value::Value as CborValue;
use pail_clock::{ClockError, ClockResult};
use pail_core::Link;

/// The operation kind a pail event carries. `Unknown` preserves whatever
/// string the wire form held so that replay (not decoding) is what raises
/// [`crate::error::CrdtError::UnknownOperation`] — the binder itself never
/// refuses to decode an event over an operation type it doesn't recognize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    Put,
    Del,
    Unknown(String),
}

impl OpKind {
    fn as_str(&self) -> &str {
        match self {
            OpKind::Put => "put",
            OpKind::Del => "del",
            OpKind::Unknown(s) => s,
        }
    }
}

/// The trie root that *results from* applying `{type, key, value?}` to the
/// writer's local view at the time the event was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub root: Link,
    pub kind: OpKind,
    pub key: String,
    pub value: Option<Link>,
}

impl Operation {
    pub fn put(root: Link, key: impl Into<String>, value: Link) -> Self {
        Self {
            root,
            kind: OpKind::Put,
            key: key.into(),
            value: Some(value),
        }
    }

    pub fn del(root: Link, key: impl Into<String>) -> Self {
        Self {
            root,
            kind: OpKind::Del,
            key: key.into(),
            value: None,
        }
    }
}

/// The concrete [`pail_clock::EventBinder`] for `Operation` (original:
/// `crdt/operation/binder.go`) — `value` is omitted from the map entirely
/// (not encoded as null) when `type == "del"`, per §6.2.
pub struct OperationBinder;

impl pail_clock::EventBinder<Operation> for OperationBinder {
    fn bind(&self, node: &CborValue) -> ClockResult<Operation> {
        let map = match node {
            CborValue::Map(fields) => fields,
            _ => return Err(ClockError::Decode("operation is not a CBOR map".into())),
        };
        let field = |name: &str| {
            map.iter()
                .find(|(k, _)| k.as_text() == Some(name))
                .map(|(_, v)| v)
        };

        let root = field("root")
            .ok_or_else(|| ClockError::Decode("missing field: root".into()))
            .and_then(|v| pail_core::value_to_link(v).map_err(|e| ClockError::Decode(e.to_string())))?;

        let type_str = field("type")
            .and_then(|v| v.as_text())
            .ok_or_else(|| ClockError::Decode("missing field: type".into()))?;
        let kind = match type_str {
            "put" => OpKind::Put,
            "del" => OpKind::Del,
            other => OpKind::Unknown(other.to_string()),
        };

        let key = field("key")
            .and_then(|v| v.as_text())
            .ok_or_else(|| ClockError::Decode("missing field: key".into()))?
            .to_string();

        let value = match field("value") {
            Some(v) => {
                Some(pail_core::value_to_link(v).map_err(|e| ClockError::Decode(e.to_string()))?)
            }
            None => None,
        };
        if kind == OpKind::Put && value.is_none() {
            return Err(ClockError::Decode("put operation is missing value".into()));
        }

        Ok(Operation {
            root,
            kind,
            key,
            value,
        })
    }

    fn unbind(&self, op: &Operation) -> ClockResult<CborValue> {
        let mut fields = vec![
            (
                CborValue::Text("root".into()),
                pail_core::link_to_value(&op.root),
            ),
            (
                CborValue::Text("type".into()),
                CborValue::Text(op.kind.as_str().to_string()),
            ),
            (CborValue::Text("key".into()), CborValue::Text(op.key.clone())),
        ];
        if op.kind == OpKind::Put {
            let value = op
                .value
                .expect("Operation invariant: put always carries a value");
            fields.push((
                CborValue::Text("value".into()),
                pail_core::link_to_value(&value),
            ));
        }
        Ok(CborValue::Map(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pail_clock::EventBinder;
    use pail_core::hash_block;

    fn link(n: u8) -> Link {
        hash_block(&[n]).unwrap()
    }

    #[test]
    fn put_operation_roundtrips() {
        let binder = OperationBinder;
        let op = Operation::put(link(1), "hello", link(2));
        let node = binder.unbind(&op).unwrap();
        let decoded = binder.bind(&node).unwrap();
        assert_eq!(op, decoded);
    }

    #[test]
    fn del_operation_omits_value_field_entirely() {
        let binder = OperationBinder;
        let op = Operation::del(link(1), "hello");
        let node = binder.unbind(&op).unwrap();
        match &node {
            CborValue::Map(fields) => {
                assert!(!fields.iter().any(|(k, _)| k.as_text() == Some("value")));
            }
            _ => panic!("expected a map"),
        }
        let decoded = binder.bind(&node).unwrap();
        assert_eq!(op, decoded);
    }

    #[test]
    fn unrecognized_operation_type_decodes_but_is_flagged_unknown() {
        let binder = OperationBinder;
        let node = CborValue::Map(vec![
            (
                CborValue::Text("root".into()),
                pail_core::link_to_value(&link(1)),
            ),
            (CborValue::Text("type".into()), CborValue::Text("frob".into())),
            (CborValue::Text("key".into()), CborValue::Text("k".into())),
        ]);
        let decoded = binder.bind(&node).unwrap();
        assert_eq!(decoded.kind, OpKind::Unknown("frob".to_string()));
    }
}
