//! # qmux-quic: QUIC Stream Multiplexing Core
//!
//! The stream-tracking subsystem of a QUIC transport endpoint: per-stream
//! state records, concurrency limit enforcement, and the derived working
//! sets (readable, writable, deliverable, loss, ...) consumed by the frame
//! scheduler and application-callback dispatcher every I/O iteration.
//!
//! ## Architecture Overview
//!
//! ```text
//! qmux-quic/
//! ├── error          - Typed stream manager errors
//! ├── interval_set   - Coalescing interval set (ID sets, byte trackers)
//! ├── stream         - Stream state machine, ID sets, priority queue,
//! │                    and the stream manager
//! ├── transport      - Transport settings consumed by the manager
//! └── types          - Stream IDs and role/direction arithmetic
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure State Machine**: No I/O, sockets, or timers. Frame events go
//!    in, state transitions and derived-set updates come out.
//!
//! 2. **Single-threaded**: One connection owns one manager; every operation
//!    runs on the connection's event-loop thread. No internal locking, no
//!    suspension points.
//!
//! 3. **Derived sets are indexes**: Their membership is a pure function of
//!    the per-stream records and is re-derived incrementally before every
//!    public-method boundary, so scheduler lookups stay O(1).
//!
//! 4. **No payload ownership**: Byte buffers belong to the transport. The
//!    records here track offsets and ranges only.

#![forbid(unsafe_code)]

pub mod error;
pub mod interval_set;
pub mod stream;
pub mod transport;
pub mod types;

pub use error::{Result, StreamError};
pub use interval_set::IntervalSet;
pub use stream::{
    Priority, PriorityQueue, RecvState, SendState, StreamDataBlockedFrame, StreamIdSet,
    StreamManager, StreamState, StreamsBlockedFrame,
};
pub use transport::TransportSettings;
pub use types::{
    ApplicationErrorCode, Side, StreamDirection, StreamGroupId, StreamId, StreamInitiator,
    StreamOffset, StreamType,
};
