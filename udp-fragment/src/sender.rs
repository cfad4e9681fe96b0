//! Outbound fragment state for stop-and-wait delivery.
//!
//! [`Sender`] walks one session's fragments in index order and tracks the
//! single in-flight fragment.  It does **not** touch the socket;
//! [`crate::client::Client`] calls these methods and owns the actual
//! send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** fragment is in flight at any moment (`unacked`).
//! - The next fragment may only be released once `unacked` is `None`.
//! - On a matching ack (`session_id` and `index`): clear `unacked`.
//! - On timeout: resend the same datagram unchanged; once `max_retries`
//!   resends have gone unanswered the session is aborted.

use tokio::time::Instant;

use crate::packet::{Ack, Datagram, Fragment};

/// A fragment that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetransmitEntry {
    /// The datagram on the wire.
    pub datagram: Datagram,
    pub index: u32,
    /// How many times this fragment has been transmitted (1 = first send).
    pub tx_count: u32,
    /// Time of the most recent transmission; its ack deadline counts from here.
    pub sent_at: Instant,
}

/// Every permitted resend of a fragment went unacknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetriesExhausted {
    pub index: u32,
    /// Transmissions made, including the first.
    pub attempts: u32,
}

/// Stop-and-wait send-side state for one session.
#[derive(Debug)]
pub struct Sender {
    session_id: u32,
    fragments: Vec<Fragment>,
    /// Position in `fragments` of the next fragment to release.
    next: usize,
    /// The in-flight fragment, or `None` when the sender is idle.
    unacked: Option<RetransmitEntry>,
    max_retries: u32,
    transmissions: u32,
}

impl Sender {
    /// `fragments` must all carry `session_id` and be ordered by index.
    pub fn new(session_id: u32, fragments: Vec<Fragment>, max_retries: u32) -> Self {
        debug_assert!(fragments
            .iter()
            .enumerate()
            .all(|(i, f)| f.session_id == session_id && f.index as usize == i));
        Self {
            session_id,
            fragments,
            next: 0,
            unacked: None,
            max_retries,
            transmissions: 0,
        }
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn total(&self) -> usize {
        self.fragments.len()
    }

    /// Fragments confirmed by the receiver so far.
    pub fn acked(&self) -> usize {
        self.next - usize::from(self.unacked.is_some())
    }

    /// Datagrams sent so far, first transmissions and resends alike.
    pub fn transmissions(&self) -> u32 {
        self.transmissions
    }

    /// `true` once every fragment has been acknowledged.
    pub fn is_finished(&self) -> bool {
        self.unacked.is_none() && self.next == self.fragments.len()
    }

    pub fn in_flight(&self) -> Option<&RetransmitEntry> {
        self.unacked.as_ref()
    }

    /// Move the next fragment into the in-flight slot and return the datagram
    /// to transmit.  Returns `None` when a fragment is already in flight or
    /// all fragments have been released.
    pub fn release(&mut self) -> Option<&Datagram> {
        if self.unacked.is_some() {
            return None;
        }
        let fragment = self.fragments.get(self.next)?.clone();
        self.next += 1;
        self.transmissions += 1;
        let entry = self.unacked.insert(RetransmitEntry {
            index: fragment.index,
            datagram: Datagram::Fragment(fragment),
            tx_count: 1,
            sent_at: Instant::now(),
        });
        Some(&entry.datagram)
    }

    /// Process an inbound ack.
    ///
    /// Returns `true` if it confirms the in-flight fragment.  Acks for another
    /// session or another index are noise and leave the state untouched.
    pub fn on_ack(&mut self, ack: Ack) -> bool {
        let matched = ack.session_id == self.session_id
            && self.unacked.as_ref().is_some_and(|e| e.index == ack.index);
        if matched {
            self.unacked = None;
        }
        matched
    }

    /// The in-flight fragment's wait expired.
    ///
    /// Returns the datagram to resend, `None` when nothing is in flight, or
    /// [`RetriesExhausted`] once `max_retries` resends have already been made.
    pub fn on_timeout(&mut self) -> Result<Option<&Datagram>, RetriesExhausted> {
        let max_retries = self.max_retries;
        let Some(entry) = self.unacked.as_mut() else {
            return Ok(None);
        };
        if entry.tx_count > max_retries {
            return Err(RetriesExhausted {
                index: entry.index,
                attempts: entry.tx_count,
            });
        }
        entry.tx_count += 1;
        entry.sent_at = Instant::now();
        self.transmissions += 1;
        Ok(Some(&entry.datagram))
    }

    /// Number of resends of the in-flight fragment, or `0` when idle.
    pub fn retransmit_count(&self) -> u32 {
        self.unacked.as_ref().map_or(0, |e| e.tx_count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmenter::fragment;

    fn ack(session_id: u32, index: u32) -> Ack {
        Ack { session_id, index }
    }

    #[tokio::test]
    async fn releases_one_fragment_at_a_time() {
        let mut s = Sender::new(42, fragment(42, b"ABCDEFGHIJKLM", 12), 10);
        assert_eq!(s.total(), 2);

        let first = s.release().cloned().unwrap();
        assert_eq!(first.encode(), b"42|0|2|4142434445464748494a4b4c");
        assert!(s.release().is_none(), "second fragment released before ack");

        assert!(s.on_ack(ack(42, 0)));
        assert_eq!(s.acked(), 1);

        let second = s.release().cloned().unwrap();
        assert_eq!(second.encode(), b"42|1|2|4d");
        assert!(s.on_ack(ack(42, 1)));
        assert!(s.is_finished());
        assert!(s.release().is_none());
        assert_eq!(s.transmissions(), 2);
    }

    #[tokio::test]
    async fn mismatched_acks_are_noise() {
        let mut s = Sender::new(7, fragment(7, b"abcdef", 3), 10);
        s.release();

        assert!(!s.on_ack(ack(8, 0)), "foreign session accepted");
        assert!(!s.on_ack(ack(7, 1)), "wrong index accepted");
        assert_eq!(s.in_flight().unwrap().index, 0);
        assert_eq!(s.retransmit_count(), 0);
    }

    #[tokio::test]
    async fn ack_while_idle_is_ignored() {
        let mut s = Sender::new(1, fragment(1, b"abc", 3), 10);
        assert!(!s.on_ack(ack(1, 0)));
        assert_eq!(s.acked(), 0);
    }

    #[tokio::test]
    async fn exhausts_after_max_retries_resends() {
        let mut s = Sender::new(5, fragment(5, b"abc", 3), 3);
        s.release();

        for resend in 1..=3 {
            let d = s
                .on_timeout()
                .expect("retry allowed")
                .expect("fragment in flight");
            assert_eq!(d.session_id(), 5);
            assert_eq!(s.retransmit_count(), resend);
        }
        assert_eq!(
            s.on_timeout(),
            Err(RetriesExhausted {
                index: 0,
                attempts: 4
            })
        );
        assert_eq!(s.transmissions(), 4);
    }

    #[tokio::test]
    async fn zero_retries_aborts_on_first_timeout() {
        let mut s = Sender::new(5, fragment(5, b"abc", 3), 0);
        s.release();
        assert_eq!(
            s.on_timeout(),
            Err(RetriesExhausted {
                index: 0,
                attempts: 1
            })
        );
    }

    #[tokio::test]
    async fn ack_resets_retry_counter_for_next_fragment() {
        let mut s = Sender::new(2, fragment(2, b"abcdef", 3), 2);
        s.release();
        s.on_timeout().unwrap();
        s.on_timeout().unwrap();
        assert!(s.on_ack(ack(2, 0)));

        s.release();
        assert_eq!(s.retransmit_count(), 0);
        assert!(s.on_timeout().is_ok());
    }

    #[tokio::test]
    async fn timeout_while_idle_is_not_an_abort() {
        let mut s = Sender::new(4, fragment(4, b"ab", 2), 0);
        assert_eq!(s.on_timeout(), Ok(None));

        s.release();
        assert!(s.on_ack(ack(4, 0)));
        assert_eq!(s.on_timeout(), Ok(None));
        assert_eq!(s.transmissions(), 1);
        assert!(s.is_finished());
    }

    #[tokio::test]
    async fn empty_session_is_finished_immediately() {
        let mut s = Sender::new(3, Vec::new(), 10);
        assert!(s.is_finished());
        assert!(s.release().is_none());
    }
}
