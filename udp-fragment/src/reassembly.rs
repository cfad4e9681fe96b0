//! Reassembly of a completed session into its original payload.

use std::collections::BTreeMap;

use crate::codec::MessageCodec;

/// The payload of a finished session, ready for the message codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassembled {
    pub session_id: u32,
    pub payload: Vec<u8>,
}

impl Reassembled {
    pub fn decode<C: MessageCodec>(&self, codec: &C) -> Result<C::Message, C::Error> {
        codec.decode(&self.payload)
    }
}

/// Concatenate chunks in ascending index order, whatever order they arrived in.
pub fn concat_chunks(fragments: BTreeMap<u32, Vec<u8>>) -> Vec<u8> {
    let len = fragments.values().map(Vec::len).sum();
    let mut payload = Vec::with_capacity(len);
    for chunk in fragments.into_values() {
        payload.extend_from_slice(&chunk);
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{DnsCodec, RawCodec};

    #[test]
    fn chunks_join_by_index_not_insertion_order() {
        let mut fragments = BTreeMap::new();
        fragments.insert(2, b"IJ".to_vec());
        fragments.insert(0, b"AB".to_vec());
        fragments.insert(1, b"CDEFGH".to_vec());
        assert_eq!(concat_chunks(fragments), b"ABCDEFGHIJ");
    }

    #[test]
    fn no_chunks_is_empty_payload() {
        assert!(concat_chunks(BTreeMap::new()).is_empty());
    }

    #[test]
    fn decode_hands_payload_to_codec() {
        let r = Reassembled {
            session_id: 1,
            payload: b"opaque".to_vec(),
        };
        assert_eq!(r.decode(&RawCodec).unwrap(), b"opaque");
        assert!(r.decode(&DnsCodec).is_err());
    }
}
