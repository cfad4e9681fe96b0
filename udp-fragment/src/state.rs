//! Receiver session-slot state.
//!
//! ```text
//!          first fragment of a new session
//!   IDLE ─────────────────────────────────▶ ACTIVE ──┐ further fragments
//!    ▲                                         │  ◀───┘
//!    │  complete │ close signal │ inactivity   │
//!    └─────────────────────────────────────────┘
//! ```
//!
//! Transitions live in [`crate::session::SessionTracker`].

/// State of the receiver's single session slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// No session tracked; the next fragment's session id is adopted.
    #[default]
    Idle,
    /// A session is in progress; fragments for any other session are dropped.
    Active,
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotState::Idle => write!(f, "idle"),
            SlotState::Active => write!(f, "active"),
        }
    }
}
