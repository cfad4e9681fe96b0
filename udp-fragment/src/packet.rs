//! Wire-format definitions for transfer datagrams.
//!
//! Every datagram exchanged between sender and receiver is a [`Datagram`].
//! This module is responsible for:
//! - Defining the on-wire text layout of fragments, close signals and acks.
//! - Serialising a [`Datagram`] into the bytes of one UDP payload.
//! - Deserialising a raw byte slice back into a [`Datagram`], returning
//!   [`PacketError`] for malformed input.
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! Fields are separated by `|`; numbers are base-10 ASCII; the chunk is
//! lowercase hex.
//!
//! ```text
//! fragment:  <session_id>|<index>|<total>|<hex chunk>
//! close:     <session_id>|close|0|0
//! ack:       <session_id>|<index>
//! ```
//!
//! Two fields decode as an ack, four or more as a fragment or close signal.
//! Fields past the fourth are ignored.  Anything else is malformed.

use thiserror::Error;

/// Field separator.
pub const SEPARATOR: char = '|';

/// Marker in the index position that turns a datagram into a close signal.
pub const CLOSE_MARKER: &str = "close";

/// One chunk of a payload, tagged with its place in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub session_id: u32,
    /// 0-based position, always `< total`.
    pub index: u32,
    pub total: u32,
    pub chunk: Vec<u8>,
}

/// Receipt for exactly one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub session_id: u32,
    pub index: u32,
}

impl Ack {
    /// The ack a receiver owes for `fragment`.
    pub fn for_fragment(fragment: &Fragment) -> Self {
        Self {
            session_id: fragment.session_id,
            index: fragment.index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    Fragment(Fragment),
    /// Sender is done with the session; never acknowledged.
    Close { session_id: u32 },
    Ack(Ack),
}

impl Datagram {
    pub fn session_id(&self) -> u32 {
        match self {
            Datagram::Fragment(f) => f.session_id,
            Datagram::Close { session_id } => *session_id,
            Datagram::Ack(a) => a.session_id,
        }
    }

    /// Serialise into the text form carried as the UDP payload.
    pub fn encode(&self) -> Vec<u8> {
        let text = match self {
            Datagram::Fragment(f) => format!(
                "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
                f.session_id,
                f.index,
                f.total,
                hex::encode(&f.chunk)
            ),
            Datagram::Close { session_id } => {
                format!("{session_id}{SEPARATOR}{CLOSE_MARKER}{SEPARATOR}0{SEPARATOR}0")
            }
            Datagram::Ack(a) => format!("{}{SEPARATOR}{}", a.session_id, a.index),
        };
        text.into_bytes()
    }

    /// Parse one received datagram.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let text = std::str::from_utf8(buf).map_err(|_| PacketError::NotText)?;
        let fields: Vec<&str> = text.split(SEPARATOR).collect();

        match fields.as_slice() {
            [session_id, index] => Ok(Datagram::Ack(Ack {
                session_id: parse_field("session id", session_id)?,
                index: parse_field("index", index)?,
            })),
            [session_id, index, total, chunk, ..] => {
                let session_id = parse_field("session id", session_id)?;
                if *index == CLOSE_MARKER {
                    return Ok(Datagram::Close { session_id });
                }
                let index = parse_field("index", index)?;
                let total = parse_field("total", total)?;
                if total == 0 {
                    return Err(PacketError::ZeroTotal);
                }
                if index >= total {
                    return Err(PacketError::IndexOutOfRange { index, total });
                }
                let chunk = hex::decode(chunk)?;
                Ok(Datagram::Fragment(Fragment {
                    session_id,
                    index,
                    total,
                    chunk,
                }))
            }
            _ => Err(PacketError::FieldCount(fields.len())),
        }
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<u32, PacketError> {
    value.parse().map_err(|_| PacketError::BadNumber {
        field,
        value: value.to_string(),
    })
}

/// Reasons a datagram is dropped as malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PacketError {
    #[error("datagram is not valid utf-8 text")]
    NotText,
    #[error("expected 2 or at least 4 fields, got {0}")]
    FieldCount(usize),
    #[error("{field} is not a number: {value:?}")]
    BadNumber { field: &'static str, value: String },
    #[error("chunk is not valid hex: {0}")]
    BadHex(#[from] hex::FromHexError),
    #[error("index {index} outside 0..{total}")]
    IndexOutOfRange { index: u32, total: u32 },
    #[error("fragment announces zero total fragments")]
    ZeroTotal,
}
