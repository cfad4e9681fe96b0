//! Receiver-side session tracking.
//!
//! The receiver serves one transfer at a time.  [`SessionTracker`] owns that
//! single slot and is the only thing that mutates it:
//! - The first fragment seen while idle starts a session and fixes its id and
//!   fragment count.
//! - Fragments carrying another session id are rejected without an ack, so a
//!   second sender cannot interleave with the active one.
//! - Accepted fragments are stored by index (re-delivery overwrites) and
//!   always produce an ack.
//! - The slot returns to idle on completion, on a close signal, or when the
//!   inactivity timer runs out.
//!
//! No I/O happens here.  Time is passed in so the state machine can be
//! driven deterministically; [`crate::server`] feeds it real datagrams.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::packet::{Ack, Datagram, Fragment};
use crate::reassembly::{concat_chunks, Reassembled};
use crate::state::SlotState;
use crate::timer::InactivityTimer;

/// One in-progress transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: u32,
    total: u32,
    fragments: BTreeMap<u32, Vec<u8>>,
    last_activity: Instant,
}

impl Session {
    fn new(id: u32, total: u32, now: Instant) -> Self {
        Self {
            id,
            total,
            fragments: BTreeMap::new(),
            last_activity: now,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Distinct indices stored so far.
    pub fn received(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_complete(&self) -> bool {
        self.fragments.len() == self.total as usize
    }

    pub fn chunk(&self, index: u32) -> Option<&[u8]> {
        self.fragments.get(&index).map(Vec::as_slice)
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    fn store(&mut self, index: u32, chunk: Vec<u8>, now: Instant) {
        self.fragments.insert(index, chunk);
        self.last_activity = now;
    }

    fn into_reassembled(self) -> Reassembled {
        Reassembled {
            session_id: self.id,
            payload: concat_chunks(self.fragments),
        }
    }
}

/// Why a datagram was dropped without an ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fragment belongs to a session other than the active one.
    SessionMismatch { expected: u32, got: u32 },
    /// Fragment for the active session disagrees on the fragment count.
    TotalMismatch {
        session_id: u32,
        expected: u32,
        got: u32,
    },
    /// Acks only ever flow towards the sender.
    UnexpectedAck(Ack),
}

/// What the caller must do after feeding the tracker one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Fragment stored: send `ack` to its source.  `completed` carries the
    /// payload when this fragment finished the session (slot is idle again).
    Accepted {
        ack: Ack,
        completed: Option<Reassembled>,
    },
    /// Close signal handled; `discarded` names the session that was dropped.
    Closed { discarded: Option<u32> },
    Rejected(Rejection),
}

/// The receiver's single session slot.
#[derive(Debug)]
pub struct SessionTracker {
    session: Option<Session>,
    timer: InactivityTimer,
}

impl SessionTracker {
    pub fn new(inactivity: Duration) -> Self {
        Self {
            session: None,
            timer: InactivityTimer::new(inactivity),
        }
    }

    pub fn state(&self) -> SlotState {
        if self.session.is_some() {
            SlotState::Active
        } else {
            SlotState::Idle
        }
    }

    /// Session id fragments must carry to be accepted, if any.
    pub fn expected_session(&self) -> Option<u32> {
        self.session.as_ref().map(Session::id)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn timer(&self) -> &InactivityTimer {
        &self.timer
    }

    pub fn on_datagram(&mut self, datagram: Datagram, now: Instant) -> Verdict {
        match datagram {
            Datagram::Fragment(f) => self.on_fragment(f, now),
            Datagram::Close { session_id } => self.on_close(session_id),
            Datagram::Ack(ack) => Verdict::Rejected(Rejection::UnexpectedAck(ack)),
        }
    }

    /// Apply one fragment.  A session whose inactivity deadline has already
    /// passed at `now` is discarded first, so a late fragment can never
    /// extend it.
    pub fn on_fragment(&mut self, fragment: Fragment, now: Instant) -> Verdict {
        if let Some(stale) = self.expire(now) {
            log::warn!(
                "[server] session {} timed out with {}/{} fragment(s), discarded",
                stale.id,
                stale.received(),
                stale.total
            );
        }
        if let Some(active) = &self.session {
            if active.id != fragment.session_id {
                return Verdict::Rejected(Rejection::SessionMismatch {
                    expected: active.id,
                    got: fragment.session_id,
                });
            }
            if active.total != fragment.total {
                return Verdict::Rejected(Rejection::TotalMismatch {
                    session_id: active.id,
                    expected: active.total,
                    got: fragment.total,
                });
            }
        } else {
            log::debug!(
                "[server] session {} started ({} fragment(s))",
                fragment.session_id,
                fragment.total
            );
        }

        let ack = Ack::for_fragment(&fragment);
        let session = self
            .session
            .get_or_insert_with(|| Session::new(fragment.session_id, fragment.total, now));
        session.store(fragment.index, fragment.chunk, now);
        self.timer.arm(now);

        let completed = if session.is_complete() {
            self.clear().map(Session::into_reassembled)
        } else {
            None
        };
        Verdict::Accepted { ack, completed }
    }

    /// Drop the active session unconditionally.
    pub fn on_close(&mut self, session_id: u32) -> Verdict {
        let discarded = self.clear().map(|s| s.id);
        if let Some(id) = discarded {
            if id != session_id {
                log::debug!("[server] close for session {session_id} discarded session {id}");
            }
        }
        Verdict::Closed { discarded }
    }

    /// Clear the slot if its inactivity deadline has passed.
    pub fn expire(&mut self, now: Instant) -> Option<Session> {
        if self.timer.is_expired(now) {
            self.clear()
        } else {
            None
        }
    }

    /// Return to idle, handing back whatever session was in progress.
    pub fn clear(&mut self) -> Option<Session> {
        self.timer.disarm();
        self.session.take()
    }
}
