//! # Stream Multiplexing (RFC 9000 Sections 2, 3)
//!
//! Stream state machines, ID sets, write scheduling, and the manager that
//! ties them together.

pub mod id_set;
pub mod manager;
pub mod priority;
pub mod state;

mod tests;

pub use id_set::StreamIdSet;
pub use manager::{StreamDataBlockedFrame, StreamManager, StreamsBlockedFrame};
pub use priority::{Priority, PriorityQueue};
pub use state::{RecvState, SendState, StreamState};

// Re-export StreamId from the types module
pub use crate::types::StreamId;
