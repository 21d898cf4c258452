//! Transport settings consumed by the stream manager.

#![forbid(unsafe_code)]

use crate::types::{MAX_STREAMS_COUNT, MAX_STREAM_GROUPS};

/// The negotiated/configured knobs the stream manager reads.
///
/// `advertised_*` values are what this endpoint offered the peer and bound
/// peer-initiated streams; `peer_*` values arrive in the peer's transport
/// parameters during the handshake and bound locally-initiated streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// Our advertised initial_max_streams_bidi (ceiling for peer-opened
    /// bidirectional streams).
    pub advertised_initial_max_streams_bidi: u64,

    /// Our advertised initial_max_streams_uni.
    pub advertised_initial_max_streams_uni: u64,

    /// Peer's initial_max_streams_bidi, once known (ceiling for locally
    /// opened bidirectional streams).
    pub peer_initial_max_streams_bidi: Option<u64>,

    /// Peer's initial_max_streams_uni, once known.
    pub peer_initial_max_streams_uni: Option<u64>,

    /// Consecutive scheduling grants a stream gets before the write queue
    /// round-robins to the next stream of equal priority.
    pub priority_queue_writes_per_stream: u64,

    /// Denominator controlling how often closed peer streams trigger a new
    /// MAX_STREAMS advertisement. Must be greater than zero.
    pub stream_limit_windowing_fraction: u64,

    /// Deliver read callbacks for unidirectional streams ahead of
    /// bidirectional ones.
    pub unidirectional_streams_read_callbacks_first: bool,

    /// Advertised initial bidirectional stream group count (0..=128).
    pub advertised_initial_bidirectional_stream_group_count: u64,

    /// Advertised initial unidirectional stream group count (0..=128).
    pub advertised_initial_unidirectional_stream_group_count: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            advertised_initial_max_streams_bidi: 100,
            advertised_initial_max_streams_uni: 100,
            peer_initial_max_streams_bidi: None,
            peer_initial_max_streams_uni: None,
            priority_queue_writes_per_stream: 1,
            stream_limit_windowing_fraction: 2,
            unidirectional_streams_read_callbacks_first: false,
            advertised_initial_bidirectional_stream_group_count: 0,
            advertised_initial_unidirectional_stream_group_count: 0,
        }
    }
}

impl TransportSettings {
    /// Validate the settings, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.stream_limit_windowing_fraction == 0 {
            errors.push("stream_limit_windowing_fraction must be greater than zero".to_string());
        }
        if self.advertised_initial_max_streams_bidi > MAX_STREAMS_COUNT {
            errors.push(format!(
                "advertised_initial_max_streams_bidi {} exceeds 2^60",
                self.advertised_initial_max_streams_bidi
            ));
        }
        if self.advertised_initial_max_streams_uni > MAX_STREAMS_COUNT {
            errors.push(format!(
                "advertised_initial_max_streams_uni {} exceeds 2^60",
                self.advertised_initial_max_streams_uni
            ));
        }
        if self.advertised_initial_bidirectional_stream_group_count > MAX_STREAM_GROUPS {
            errors.push(format!(
                "advertised_initial_bidirectional_stream_group_count {} exceeds {}",
                self.advertised_initial_bidirectional_stream_group_count, MAX_STREAM_GROUPS
            ));
        }
        if self.advertised_initial_unidirectional_stream_group_count > MAX_STREAM_GROUPS {
            errors.push(format!(
                "advertised_initial_unidirectional_stream_group_count {} exceeds {}",
                self.advertised_initial_unidirectional_stream_group_count, MAX_STREAM_GROUPS
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
