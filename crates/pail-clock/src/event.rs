//! `Event<T> = (parents: Link[], data: T)` and its CBOR wire form (§4.E, §6.2).

use ciborium::value::Value as CborValue;
use pail_block::{Block, BlockView};
use pail_core::Link;

use crate::error::{ClockError, ClockResult};

/// A user-supplied pair of conversions between the event's generic `data`
/// field and its IPLD/CBOR node, parameterized at the call site rather than
/// via subclassing.
pub trait EventBinder<T> {
    fn bind(&self, node: &CborValue) -> ClockResult<T>;
    fn unbind(&self, data: &T) -> ClockResult<CborValue>;
}

/// An immutable record of one operation plus the head observed by the writer
/// at the time. Events form a DAG via `parents`; identity is the CID of the
/// event's CBOR encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<T> {
    parents: Vec<Link>,
    data: T,
}

impl<T> Event<T> {
    pub fn new(data: T, parents: Vec<Link>) -> Self {
        Self { parents, data }
    }

    pub fn parents(&self) -> &[Link] {
        &self.parents
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

pub type EventBlock<T> = BlockView<Event<T>>;

/// Serialize an [`Event`] to CBOR bytes: map `{parents, data}` in that order.
pub fn marshal<T>(event: &Event<T>, binder: &dyn EventBinder<T>) -> ClockResult<Vec<u8>> {
    let parents = CborValue::Array(
        event
            .parents
            .iter()
            .map(pail_core::link_to_value)
            .collect(),
    );
    let data = binder.unbind(&event.data)?;
    let node = CborValue::Map(vec![
        (CborValue::Text("parents".into()), parents),
        (CborValue::Text("data".into()), data),
    ]);
    pail_core::encode(&node).map_err(ClockError::from)
}

/// Deserialize CBOR bytes to an [`Event`].
pub fn unmarshal<T>(bytes: &[u8], binder: &dyn EventBinder<T>) -> ClockResult<Event<T>> {
    let node = pail_core::decode(bytes)?;
    let map = match &node {
        CborValue::Map(fields) => fields,
        _ => return Err(ClockError::Decode("event is not a CBOR map".into())),
    };

    let parents_node = map
        .iter()
        .find(|(k, _)| k.as_text() == Some("parents"))
        .map(|(_, v)| v)
        .ok_or_else(|| ClockError::Decode("missing field: parents".into()))?;
    let parents = match parents_node {
        CborValue::Array(items) => items
            .iter()
            .map(|v| {
                pail_core::value_to_link(v).map_err(|e| ClockError::Decode(e.to_string()))
            })
            .collect::<ClockResult<Vec<_>>>()?,
        _ => return Err(ClockError::Decode("parents is not a list".into())),
    };

    let data_node = map
        .iter()
        .find(|(k, _)| k.as_text() == Some("data"))
        .map(|(_, v)| v)
        .ok_or_else(|| ClockError::Decode("missing field: data".into()))?;
    let data = binder.bind(data_node)?;

    Ok(Event { parents, data })
}

/// Marshal, hash, and wrap as a [`Block`] (§4.E).
pub fn encode_block<T>(event: Event<T>, binder: &dyn EventBinder<T>) -> ClockResult<EventBlock<T>> {
    let bytes = marshal(&event, binder)?;
    let link = pail_core::hash_block(&bytes)?;
    Ok(BlockView::new(link, bytes, event))
}

/// Decode a previously-fetched [`Block`] into an [`EventBlock`].
pub fn decode_block<T>(block: Block, binder: &dyn EventBinder<T>) -> ClockResult<EventBlock<T>> {
    let event = unmarshal(block.bytes(), binder)?;
    Ok(BlockView::new(*block.link(), block.into_bytes(), event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pail_core::hash_block;

    struct StringBinder;

    impl EventBinder<String> for StringBinder {
        fn bind(&self, node: &CborValue) -> ClockResult<String> {
            node.as_text()
                .map(str::to_string)
                .ok_or_else(|| ClockError::Decode("data is not a string".into()))
        }

        fn unbind(&self, data: &String) -> ClockResult<CborValue> {
            Ok(CborValue::Text(data.clone()))
        }
    }

    fn link(n: u8) -> Link {
        hash_block(&[n]).unwrap()
    }

    #[test]
    fn event_roundtrips() {
        let binder = StringBinder;
        let event = Event::new("hello".to_string(), vec![link(1), link(2)]);
        let bytes = marshal(&event, &binder).unwrap();
        let decoded = unmarshal(&bytes, &binder).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn genesis_event_has_no_parents() {
        let binder = StringBinder;
        let event = Event::new("genesis".to_string(), vec![]);
        let bytes = marshal(&event, &binder).unwrap();
        let decoded = unmarshal(&bytes, &binder).unwrap();
        assert!(decoded.parents().is_empty());
    }

    #[test]
    fn block_link_is_stable_across_reencode() {
        let binder = StringBinder;
        let event = Event::new("x".to_string(), vec![link(3)]);
        let block1 = encode_block(event, &binder).unwrap();
        let reencoded = unmarshal(block1.bytes(), &binder).unwrap();
        let block2 = encode_block(reencoded, &binder).unwrap();
        assert_eq!(block1.link(), block2.link());
    }
}
