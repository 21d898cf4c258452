//! Error types for stream manager operations.

use thiserror::Error;

/// Errors surfaced by the stream manager.
///
/// All of these are recoverable by the caller. `StreamLimitExceeded` is the
/// one kind the caller MUST escalate to a CONNECTION_CLOSE per RFC 9000
/// Section 4.6. Programmer errors (misaligned stream ID set inserts,
/// removing a non-terminal stream, double close) panic instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    /// Local stream creation would exceed the peer-advertised limit.
    #[error("stream limit reached")]
    StreamLimitReached,

    /// Peer used a stream ID at or beyond the limit we advertised.
    #[error("peer exceeded stream limit")]
    StreamLimitExceeded,

    /// Stream ID class bits are wrong for this context.
    #[error("invalid stream id")]
    InvalidStreamId,

    /// Referenced stream group has not been created.
    #[error("unknown stream group")]
    GroupUnknown,

    /// The per-direction stream group cap has been hit.
    #[error("stream group limit reached")]
    GroupLimitReached,

    /// Lookup of a local stream that was closed or never opened.
    #[error("stream not found")]
    StreamNotFound,
}

/// Result alias for stream manager operations.
pub type Result<T> = core::result::Result<T, StreamError>;
