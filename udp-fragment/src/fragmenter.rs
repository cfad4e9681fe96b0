//! Payload chunking.
//!
//! A payload of `N` bytes becomes `ceil(N / chunk_size)` fragments sharing
//! one session id.  Every fragment but the last carries exactly
//! `chunk_size` bytes.  An empty payload yields no fragments.

use rand::Rng;

use crate::packet::Fragment;

/// Pick a session id for a new transfer, uniformly at random.
pub fn new_session_id() -> u32 {
    rand::rng().random()
}

/// Number of fragments needed for `len` payload bytes.
///
/// # Panics
///
/// Panics if `chunk_size` is zero; [`crate::config::TransferConfig::validate`]
/// rules that out before a transfer starts.
pub fn fragment_count(len: usize, chunk_size: usize) -> usize {
    assert!(chunk_size > 0, "chunk_size must be at least 1");
    len.div_ceil(chunk_size)
}

/// Split `payload` into indexed fragments of at most `chunk_size` bytes.
///
/// # Panics
///
/// Panics if `chunk_size` is zero, or if the payload would need more than
/// `u32::MAX` fragments.
pub fn fragment(session_id: u32, payload: &[u8], chunk_size: usize) -> Vec<Fragment> {
    let count = fragment_count(payload.len(), chunk_size);
    assert!(count <= u32::MAX as usize, "payload needs {count} fragments");
    let total = count as u32;

    payload
        .chunks(chunk_size)
        .zip(0u32..)
        .map(|(chunk, index)| Fragment {
            session_id,
            index,
            total,
            chunk: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirteen_bytes_in_chunks_of_twelve() {
        let frags = fragment(42, b"ABCDEFGHIJKLM", 12);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].chunk, b"ABCDEFGHIJKL");
        assert_eq!(frags[1].chunk, b"M");
        for (i, f) in frags.iter().enumerate() {
            assert_eq!(f.session_id, 42);
            assert_eq!(f.index, i as u32);
            assert_eq!(f.total, 2);
        }
    }

    #[test]
    fn empty_payload_has_no_fragments() {
        assert!(fragment(1, b"", 12).is_empty());
        assert_eq!(fragment_count(0, 12), 0);
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let frags = fragment(1, &[7u8; 24], 12);
        assert_eq!(frags.len(), 2);
        assert!(frags.iter().all(|f| f.chunk.len() == 12));
    }

    #[test]
    fn chunk_size_one() {
        let frags = fragment(3, b"xyz", 1);
        assert_eq!(frags.len(), 3);
        assert_eq!(frags[2].chunk, b"z");
        assert_eq!(frags[2].index, 2);
    }

    #[test]
    fn count_matches_ceiling_division() {
        for len in 0..50 {
            for chunk in 1..15 {
                let expected = (len + chunk - 1) / chunk;
                assert_eq!(fragment_count(len, chunk), expected);
                assert_eq!(fragment(0, &vec![0u8; len], chunk).len(), expected);
            }
        }
    }

    #[test]
    fn concatenated_chunks_equal_payload() {
        let payload: Vec<u8> = (0..=255).collect();
        let joined: Vec<u8> = fragment(9, &payload, 7)
            .into_iter()
            .flat_map(|f| f.chunk)
            .collect();
        assert_eq!(joined, payload);
    }

    #[test]
    #[should_panic]
    fn zero_chunk_size_panics() {
        fragment(1, b"abc", 0);
    }
}
