//! Message codecs: the boundary between domain objects and transfer payloads.
//!
//! The transfer layer moves opaque bytes.  A [`MessageCodec`] is consulted
//! exactly twice per transfer: by the sender before fragmenting, and by the
//! receiver after a complete reassembly.

use std::convert::Infallible;

use dns_query::{DnsError, DnsMessage};

pub trait MessageCodec {
    type Message;
    type Error: std::error::Error + Send + Sync + 'static;

    fn encode(&self, message: &Self::Message) -> Result<Vec<u8>, Self::Error>;
    fn decode(&self, bytes: &[u8]) -> Result<Self::Message, Self::Error>;
}

/// Identity codec: the payload is the message.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl MessageCodec for RawCodec {
    type Message = Vec<u8>;
    type Error = Infallible;

    fn encode(&self, message: &Vec<u8>) -> Result<Vec<u8>, Infallible> {
        Ok(message.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, Infallible> {
        Ok(bytes.to_vec())
    }
}

/// DNS query messages in RFC 1035 binary form.
#[derive(Debug, Clone, Copy, Default)]
pub struct DnsCodec;

impl MessageCodec for DnsCodec {
    type Message = DnsMessage;
    type Error = DnsError;

    fn encode(&self, message: &DnsMessage) -> Result<Vec<u8>, DnsError> {
        message.encode()
    }

    fn decode(&self, bytes: &[u8]) -> Result<DnsMessage, DnsError> {
        DnsMessage::decode(bytes)
    }
}
