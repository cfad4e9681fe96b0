//! Domain-name label encoding (RFC 1035 §3.1, §4.1.4).

use crate::dns::DnsError;

/// Longest single label, in bytes.
pub const MAX_LABEL_LEN: usize = 63;

/// Longest encoded name, in bytes, including length octets and the root label.
pub const MAX_NAME_LEN: usize = 255;

/// Fully qualify `name` by appending the root dot when it is missing.
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Append the uncompressed wire form of `name` to `out`.
///
/// `""` and `"."` encode as the root label.  A trailing dot is optional.
pub fn encode_name(out: &mut Vec<u8>, name: &str) -> Result<(), DnsError> {
    let trimmed = name.strip_suffix('.').unwrap_or(name);
    if trimmed.is_empty() {
        out.push(0);
        return Ok(());
    }

    let start = out.len();
    for label in trimmed.split('.') {
        if label.is_empty() {
            return Err(DnsError::InvalidName(format!("empty label in {name:?}")));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsError::LabelTooLong(label.len()));
        }
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);

    let encoded = out.len() - start;
    if encoded > MAX_NAME_LEN {
        out.truncate(start);
        return Err(DnsError::NameTooLong(encoded));
    }
    Ok(())
}

/// Read a (possibly compressed) name starting at `offset`.
///
/// Returns the fully qualified name and the offset of the first byte after
/// the name as it appears at `offset` (a pointer counts as two bytes).
/// Pointers must jump strictly backwards, which rules out loops.
pub fn decode_name(data: &[u8], offset: usize) -> Result<(String, usize), DnsError> {
    let mut labels: Vec<String> = Vec::new();
    let mut cursor = offset;
    let mut resume_at = None;
    let mut wire_len = 1usize;

    loop {
        let len = *data
            .get(cursor)
            .ok_or_else(|| DnsError::InvalidPacket("name overflow".into()))?;

        if len == 0 {
            let next = resume_at.unwrap_or(cursor + 1);
            let name = if labels.is_empty() {
                ".".to_string()
            } else {
                format!("{}.", labels.join("."))
            };
            return Ok((name, next));
        }

        if len & 0xC0 == 0xC0 {
            let low = *data
                .get(cursor + 1)
                .ok_or_else(|| DnsError::InvalidPacket("pointer overflow".into()))?;
            let target = (((len & 0x3F) as usize) << 8) | low as usize;
            if target >= cursor {
                return Err(DnsError::InvalidPacket("forward compression pointer".into()));
            }
            if resume_at.is_none() {
                resume_at = Some(cursor + 2);
            }
            cursor = target;
            continue;
        }

        if len & 0xC0 != 0 {
            return Err(DnsError::InvalidPacket("reserved label type".into()));
        }

        let start = cursor + 1;
        let end = start + len as usize;
        let bytes = data
            .get(start..end)
            .ok_or_else(|| DnsError::InvalidPacket("label overflow".into()))?;
        wire_len += 1 + bytes.len();
        if wire_len > MAX_NAME_LEN {
            return Err(DnsError::NameTooLong(wire_len));
        }
        let label = std::str::from_utf8(bytes)
            .map_err(|_| DnsError::InvalidPacket("label is not utf-8".into()))?;
        labels.push(label.to_string());
        cursor = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fqdn_appends_root_once() {
        assert_eq!(fqdn("example.com"), "example.com.");
        assert_eq!(fqdn("example.com."), "example.com.");
    }

    #[test]
    fn encode_plain_name() {
        let mut out = Vec::new();
        encode_name(&mut out, "www.example.com").unwrap();
        assert_eq!(out, b"\x03www\x07example\x03com\x00");
    }

    #[test]
    fn trailing_dot_does_not_change_encoding() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        encode_name(&mut a, "example.com").unwrap();
        encode_name(&mut b, "example.com.").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn root_encodes_as_single_zero() {
        let mut out = Vec::new();
        encode_name(&mut out, ".").unwrap();
        assert_eq!(out, [0]);
    }

    #[test]
    fn empty_inner_label_rejected() {
        let mut out = Vec::new();
        assert!(matches!(
            encode_name(&mut out, "a..b"),
            Err(DnsError::InvalidName(_))
        ));
    }

    #[test]
    fn long_label_rejected() {
        let mut out = Vec::new();
        let label = "x".repeat(MAX_LABEL_LEN + 1);
        assert!(matches!(
            encode_name(&mut out, &label),
            Err(DnsError::LabelTooLong(64))
        ));
    }

    #[test]
    fn overlong_name_rejected_and_buffer_restored() {
        let mut out = vec![0xAA];
        let name = vec!["a".repeat(60); 5].join(".");
        assert!(matches!(
            encode_name(&mut out, &name),
            Err(DnsError::NameTooLong(_))
        ));
        assert_eq!(out, [0xAA]);
    }

    #[test]
    fn decode_follows_backward_pointer() {
        // "example.com." at 0, then "www" + pointer to 0 at 13.
        let mut data = Vec::new();
        encode_name(&mut data, "example.com").unwrap();
        let www_at = data.len();
        data.extend_from_slice(b"\x03www\xC0\x00");

        let (name, next) = decode_name(&data, www_at).unwrap();
        assert_eq!(name, "www.example.com.");
        assert_eq!(next, data.len());
    }

    #[test]
    fn decode_rejects_self_pointer() {
        let data = [0xC0, 0x00];
        assert!(decode_name(&data, 0).is_err());
    }

    #[test]
    fn decode_truncated_label() {
        let data = b"\x07exam";
        assert!(decode_name(data, 0).is_err());
    }

    #[test]
    fn decode_root() {
        assert_eq!(decode_name(&[0], 0).unwrap(), (".".to_string(), 1));
    }
}
