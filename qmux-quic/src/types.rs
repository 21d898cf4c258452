//! # Core Stream Types (RFC 9000 Section 2.1)
//!
//! Stream identifiers and the role/direction arithmetic the stream manager
//! is built on. The two least significant bits of a stream ID encode the
//! stream type; IDs of one type advance in increments of four.

#![forbid(unsafe_code)]

// ============================================================================
// Stream ID (RFC 9000 Section 2.1)
// ============================================================================

/// Increment between consecutive stream IDs of the same type.
pub const STREAM_INCREMENT: u64 = 0x04;

/// Increment between consecutive stream group IDs.
pub const STREAM_GROUP_INCREMENT: u64 = 0x04;

/// Maximum number of stream groups per direction.
pub const MAX_STREAM_GROUPS: u64 = 128;

/// Maximum value encodable as a QUIC varint (2^62 - 1).
pub const VARINT_MAX: u64 = (1u64 << 62) - 1;

/// Largest count accepted in a MAX_STREAMS frame (RFC 9000 Section 4.6).
pub const MAX_STREAMS_COUNT: u64 = 1u64 << 60;

/// Stream ID - Identifies a bidirectional or unidirectional stream
///
/// The two least significant bits encode stream type and initiator:
/// - Bit 0: Initiator (0=client, 1=server)
/// - Bit 1: Direction (0=bidirectional, 1=unidirectional)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

/// Stream group IDs share the stream ID numbering space.
pub type StreamGroupId = StreamId;

impl StreamId {
    /// Create a new StreamId
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Check if this stream is bidirectional
    pub const fn is_bidirectional(self) -> bool {
        (self.0 & 0x02) == 0
    }

    /// Check if this stream is unidirectional
    pub const fn is_unidirectional(self) -> bool {
        (self.0 & 0x02) != 0
    }

    /// Check if this stream was initiated by the client
    pub const fn is_client_initiated(self) -> bool {
        (self.0 & 0x01) == 0
    }

    /// Check if this stream was initiated by the server
    pub const fn is_server_initiated(self) -> bool {
        (self.0 & 0x01) != 0
    }

    /// Get the direction of this stream
    pub const fn direction(self) -> StreamDirection {
        if self.is_bidirectional() {
            StreamDirection::Bidirectional
        } else {
            StreamDirection::Unidirectional
        }
    }

    /// Get the initiator of this stream
    pub const fn initiator(self) -> StreamInitiator {
        if self.is_client_initiated() {
            StreamInitiator::Client
        } else {
            StreamInitiator::Server
        }
    }

    /// Extract the stream type from the two low bits
    pub const fn stream_type(self) -> StreamType {
        match self.0 & 0x03 {
            0x00 => StreamType::ClientBidirectional,
            0x01 => StreamType::ServerBidirectional,
            0x02 => StreamType::ClientUnidirectional,
            _ => StreamType::ServerUnidirectional,
        }
    }

    /// Check if this stream was initiated by `side`
    pub const fn is_local_for(self, side: Side) -> bool {
        match side {
            Side::Client => self.is_client_initiated(),
            Side::Server => self.is_server_initiated(),
        }
    }

    /// Check if this stream was initiated by the peer of `side`
    pub const fn is_peer_for(self, side: Side) -> bool {
        !self.is_local_for(side)
    }

    /// The next stream ID of the same type
    pub const fn next(self) -> StreamId {
        StreamId(self.0 + STREAM_INCREMENT)
    }
}

impl core::fmt::Display for StreamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stream Type - Encodes directionality and initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Client-initiated bidirectional stream
    ClientBidirectional = 0x00,
    /// Server-initiated bidirectional stream
    ServerBidirectional = 0x01,
    /// Client-initiated unidirectional stream
    ClientUnidirectional = 0x02,
    /// Server-initiated unidirectional stream
    ServerUnidirectional = 0x03,
}

impl StreamType {
    /// Check if this stream type is bidirectional
    pub const fn is_bidirectional(self) -> bool {
        matches!(
            self,
            StreamType::ClientBidirectional | StreamType::ServerBidirectional
        )
    }

    /// Check if this stream type is client-initiated
    pub const fn is_client_initiated(self) -> bool {
        matches!(
            self,
            StreamType::ClientBidirectional | StreamType::ClientUnidirectional
        )
    }
}

/// Stream Direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Bidirectional,
    Unidirectional,
}

/// Stream Initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamInitiator {
    Client,
    Server,
}

/// Stream Offset - Byte offset within a stream
pub type StreamOffset = u64;

/// Application-level error code carried in RESET_STREAM / STOP_SENDING.
pub type ApplicationErrorCode = u64;

// ============================================================================
// Side (Client vs Server)
// ============================================================================

/// Connection endpoint side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Client endpoint
    Client,
    /// Server endpoint
    Server,
}

impl Side {
    /// Check if this side is the client
    pub const fn is_client(self) -> bool {
        matches!(self, Side::Client)
    }

    /// Check if this side is the server
    pub const fn is_server(self) -> bool {
        matches!(self, Side::Server)
    }

    /// Get the opposite side
    pub const fn opposite(self) -> Side {
        match self {
            Side::Client => Side::Server,
            Side::Server => Side::Client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_type_bits() {
        assert_eq!(StreamId(0).stream_type(), StreamType::ClientBidirectional);
        assert_eq!(StreamId(1).stream_type(), StreamType::ServerBidirectional);
        assert_eq!(StreamId(2).stream_type(), StreamType::ClientUnidirectional);
        assert_eq!(StreamId(3).stream_type(), StreamType::ServerUnidirectional);

        assert!(StreamId(4).is_bidirectional());
        assert!(StreamId(4).is_client_initiated());
        assert!(StreamId(7).is_unidirectional());
        assert!(StreamId(7).is_server_initiated());
    }

    #[test]
    fn test_stream_id_role_arithmetic() {
        // Server-initiated bidi stream 1 is local for the server, peer for
        // the client.
        assert!(StreamId(1).is_local_for(Side::Server));
        assert!(StreamId(1).is_peer_for(Side::Client));
        assert!(StreamId(0).is_local_for(Side::Client));
        assert!(StreamId(0).is_peer_for(Side::Server));
    }

    #[test]
    fn test_stream_id_next() {
        assert_eq!(StreamId(3).next(), StreamId(7));
        assert_eq!(StreamId(3).next().stream_type(), StreamId(3).stream_type());
    }
}
