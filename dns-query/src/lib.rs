//! `dns-query`: encoding and decoding of DNS query messages.
//!
//! - [`dns`]: header, question, message types and the binary codec
//! - [`name`]: domain-name label encoding and pointer-aware decoding

pub mod dns;
pub mod name;

pub use dns::{DnsError, DnsHeader, DnsMessage, DnsQuestion, RecordClass, RecordType};
pub use name::fqdn;

/// Build a recursive `IN` query for `domain` with a random message id.
pub fn build_query(domain: &str, qtype: RecordType) -> DnsMessage {
    DnsMessage::new_query(rand::random::<u16>(), domain, qtype)
}
