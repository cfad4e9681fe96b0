use std::fmt;
use thiserror::Error;

use crate::name::{decode_name, encode_name, fqdn};

/// Byte length of the fixed message header.
pub const HEADER_LEN: usize = 12;

/// Bit masks for the header `flags` word.
pub mod flags {
    /// Message is a response.
    pub const QR: u16 = 0x8000;
    /// Authoritative answer.
    pub const AA: u16 = 0x0400;
    /// Truncated.
    pub const TC: u16 = 0x0200;
    /// Recursion desired.
    pub const RD: u16 = 0x0100;
    /// Recursion available.
    pub const RA: u16 = 0x0080;
    pub const OPCODE_MASK: u16 = 0x7800;
    pub const RCODE_MASK: u16 = 0x000F;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    ANY,
    /// Any other qtype; kept so foreign queries still decode.
    Unknown(u16),
}

impl RecordType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            12 => RecordType::PTR,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            255 => RecordType::ANY,
            _ => RecordType::Unknown(value),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::ANY => 255,
            RecordType::Unknown(v) => v,
        }
    }
}

impl std::str::FromStr for RecordType {
    type Err = DnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "SOA" => Ok(RecordType::SOA),
            "PTR" => Ok(RecordType::PTR),
            "MX" => Ok(RecordType::MX),
            "TXT" => Ok(RecordType::TXT),
            "AAAA" => Ok(RecordType::AAAA),
            "ANY" => Ok(RecordType::ANY),
            other => Err(DnsError::UnknownRecordType(other.to_string())),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordType::Unknown(v) => write!(f, "TYPE{v}"),
            known => write!(f, "{known:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    IN,
    CH,
    HS,
    ANY,
    Unknown(u16),
}

impl RecordClass {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            3 => RecordClass::CH,
            4 => RecordClass::HS,
            255 => RecordClass::ANY,
            _ => RecordClass::Unknown(value),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordClass::IN => 1,
            RecordClass::CH => 3,
            RecordClass::HS => 4,
            RecordClass::ANY => 255,
            RecordClass::Unknown(v) => v,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecordClass::IN => write!(f, "IN"),
            RecordClass::CH => write!(f, "CH"),
            RecordClass::HS => write!(f, "HS"),
            RecordClass::ANY => write!(f, "ANY"),
            RecordClass::Unknown(v) => write!(f, "CLASS{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl DnsHeader {
    /// Standard query header with recursion desired and one question.
    pub fn new_query(id: u16) -> Self {
        Self {
            id,
            flags: flags::RD,
            qdcount: 1,
            ancount: 0,
            nscount: 0,
            arcount: 0,
        }
    }

    pub fn is_response(&self) -> bool {
        self.flags & flags::QR != 0
    }

    pub fn recursion_desired(&self) -> bool {
        self.flags & flags::RD != 0
    }

    pub fn truncated(&self) -> bool {
        self.flags & flags::TC != 0
    }

    pub fn opcode(&self) -> u8 {
        ((self.flags & flags::OPCODE_MASK) >> 11) as u8
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & flags::RCODE_MASK) as u8
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DnsError> {
        let h = bytes
            .get(..HEADER_LEN)
            .ok_or_else(|| DnsError::InvalidPacket("header too short".into()))?;
        let word = |i: usize| u16::from_be_bytes([h[i], h[i + 1]]);

        Ok(Self {
            id: word(0),
            flags: word(2),
            qdcount: word(4),
            ancount: word(6),
            nscount: word(8),
            arcount: word(10),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        [
            self.id,
            self.flags,
            self.qdcount,
            self.ancount,
            self.nscount,
            self.arcount,
        ]
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .collect()
    }

    fn flag_names(&self) -> Vec<&'static str> {
        [
            (flags::QR, "qr"),
            (flags::AA, "aa"),
            (flags::TC, "tc"),
            (flags::RD, "rd"),
            (flags::RA, "ra"),
        ]
        .iter()
        .filter(|(bit, _)| self.flags & bit != 0)
        .map(|&(_, name)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

/// A DNS query: header plus question section.
///
/// Answer, authority and additional sections are not carried; decoding a
/// message that announces any of them fails with [`DnsError::Unsupported`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
}

impl DnsMessage {
    /// Build a single-question `IN` query for `name` (fully qualified on the way in).
    pub fn new_query(id: u16, name: &str, qtype: RecordType) -> Self {
        Self {
            header: DnsHeader::new_query(id),
            questions: vec![DnsQuestion {
                name: fqdn(name),
                qtype,
                qclass: RecordClass::IN,
            }],
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, DnsError> {
        let mut header = self.header.clone();
        header.qdcount = u16::try_from(self.questions.len())
            .map_err(|_| DnsError::InvalidPacket("too many questions".into()))?;
        header.ancount = 0;
        header.nscount = 0;
        header.arcount = 0;

        let mut out = header.to_bytes();
        for q in &self.questions {
            encode_name(&mut out, &q.name)?;
            out.extend_from_slice(&q.qtype.to_u16().to_be_bytes());
            out.extend_from_slice(&q.qclass.to_u16().to_be_bytes());
        }
        Ok(out)
    }

    /// Parse a query message.  The buffer must be consumed exactly.
    pub fn decode(data: &[u8]) -> Result<Self, DnsError> {
        let header = DnsHeader::from_bytes(data)?;
        if header.qdcount == 0 {
            return Err(DnsError::InvalidPacket("no question".into()));
        }
        if header.ancount != 0 || header.nscount != 0 || header.arcount != 0 {
            return Err(DnsError::Unsupported(format!(
                "record sections (an={}, ns={}, ar={})",
                header.ancount, header.nscount, header.arcount
            )));
        }

        let mut offset = HEADER_LEN;
        let mut questions = Vec::with_capacity(question_capacity(header.qdcount, data.len()));
        for _ in 0..header.qdcount {
            let (name, o) = decode_name(data, offset)?;
            let fixed = data
                .get(o..o + 4)
                .ok_or_else(|| DnsError::InvalidPacket("question overflow".into()))?;
            questions.push(DnsQuestion {
                name,
                qtype: RecordType::from_u16(u16::from_be_bytes([fixed[0], fixed[1]])),
                qclass: RecordClass::from_u16(u16::from_be_bytes([fixed[2], fixed[3]])),
            });
            offset = o + 4;
        }

        if offset != data.len() {
            return Err(DnsError::InvalidPacket(format!(
                "{} trailing bytes",
                data.len() - offset
            )));
        }

        Ok(Self { header, questions })
    }
}

/// Questions the buffer could hold at most: a root name plus type and class
/// is 5 bytes.  Keeps a forged `qdcount` from sizing the allocation.
fn question_capacity(qdcount: u16, len: usize) -> usize {
    const MIN_QUESTION_LEN: usize = 5;
    (qdcount as usize).min(len.saturating_sub(HEADER_LEN) / MIN_QUESTION_LEN)
}

impl fmt::Display for DnsMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let h = &self.header;
        let opcode = match h.opcode() {
            0 => "QUERY".to_string(),
            1 => "IQUERY".to_string(),
            2 => "STATUS".to_string(),
            n => format!("OPCODE{n}"),
        };
        writeln!(f, ";; opcode: {}, status: {}, id: {}", opcode, rcode_name(h.rcode()), h.id)?;
        writeln!(
            f,
            ";; flags: {}; QUERY: {}, ANSWER: 0, AUTHORITY: 0, ADDITIONAL: 0",
            h.flag_names().join(" "),
            self.questions.len()
        )?;
        writeln!(f)?;
        write!(f, ";; QUESTION SECTION:")?;
        for q in &self.questions {
            write!(f, "\n;{}\t{}\t {}", q.name, q.qclass, q.qtype)?;
        }
        Ok(())
    }
}

fn rcode_name(rcode: u8) -> String {
    match rcode {
        0 => "NOERROR".into(),
        1 => "FORMERR".into(),
        2 => "SERVFAIL".into(),
        3 => "NXDOMAIN".into(),
        4 => "NOTIMP".into(),
        5 => "REFUSED".into(),
        n => format!("RCODE{n}"),
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DnsError {
    #[error("Invalid DNS packet: {0}")]
    InvalidPacket(String),
    #[error("Invalid domain name: {0}")]
    InvalidName(String),
    #[error("Label of {0} bytes exceeds 63")]
    LabelTooLong(usize),
    #[error("Name of {0} bytes exceeds 255")]
    NameTooLong(usize),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),
}
