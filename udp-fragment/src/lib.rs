//! `udp-fragment`: acknowledged, fragmented delivery of one payload over UDP.
//!
//! # Architecture
//!
//! ```text
//!   sender side                                  receiver side
//!  ┌────────────┐                              ┌─────────────────┐
//!  │   Client   │  fragment  sid|i|n|hex ───▶  │     Server      │
//!  │ (delivery  │                              │ (single owning  │
//!  │   loop)    │  ◀─── ack  sid|i             │   task loop)    │
//!  └─────┬──────┘                              └───┬─────────┬───┘
//!        │ one fragment in flight                  │         │
//!  ┌─────▼──────┐                          ┌───────▼──┐ ┌────▼──────────┐
//!  │   Sender   │                          │ Session  │ │ Inactivity    │
//!  │ (retries)  │                          │ Tracker  │ │ Timer         │
//!  └─────┬──────┘                          └───────┬──┘ └───────────────┘
//!  ┌─────▼──────┐                          ┌───────▼──┐
//!  │ Fragmenter │                          │Reassembly│──▶ MessageCodec
//!  └────────────┘                          └──────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`config`]: tunable timeouts, retry bound, chunk size, port
//! - [`packet`]: wire format (serialise / deserialise)
//! - [`fragmenter`]: payload chunking and session ids
//! - [`sender`]: stop-and-wait outbound state (in-flight fragment, retries)
//! - [`client`]: sender-side delivery loop over a socket
//! - [`state`]: receiver slot states
//! - [`session`]: receiver session tracking and fragment storage
//! - [`reassembly`]: ordered concatenation of a completed session
//! - [`timer`]: session inactivity timer
//! - [`server`]: receiver loop
//! - [`codec`]: message encode/decode at the payload boundary
//! - [`simulator`]: lossy relay for exercising retransmission
//! - [`socket`]: async UDP socket abstraction

pub mod client;
pub mod codec;
pub mod config;
pub mod fragmenter;
pub mod packet;
pub mod reassembly;
pub mod sender;
pub mod server;
pub mod session;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod timer;
