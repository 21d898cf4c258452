//! # Stream Manager (RFC 9000 Sections 2, 3, 4.6)
//!
//! Tracks every logical stream on a connection, enforces the negotiated
//! stream concurrency limits, and classifies streams into the working sets
//! the frame scheduler and application-callback dispatcher read every I/O
//! iteration.
//!
//! The manager is a pure state machine: frame events from packet processing
//! come in, per-stream state records mutate, and the derived sets (readable,
//! writable, deliverable, loss, ...) are re-derived before any public method
//! returns. One connection owns one manager; everything here runs on the
//! connection's event-loop thread with no internal locking.

#![forbid(unsafe_code)]

use crate::error::{Result, StreamError};
use crate::stream::id_set::StreamIdSet;
use crate::stream::priority::{Priority, PriorityQueue};
use crate::stream::state::StreamState;
use crate::transport::settings::TransportSettings;
use crate::types::{
    ApplicationErrorCode, Side, StreamDirection, StreamGroupId, StreamId, StreamOffset,
    MAX_STREAMS_COUNT, MAX_STREAM_GROUPS, STREAM_INCREMENT,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Pending STREAM_DATA_BLOCKED record for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamDataBlockedFrame {
    pub stream_id: StreamId,
    pub offset: StreamOffset,
}

/// Pending STREAMS_BLOCKED record, queued when local stream creation hits
/// the peer-advertised limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamsBlockedFrame {
    pub direction: StreamDirection,
    pub stream_limit: u64,
}

/// Orchestrator for all per-stream state and the derived working sets.
#[derive(Debug)]
pub struct StreamManager {
    side: Side,
    settings: TransportSettings,

    // Next acceptable stream id that can be opened by the peer. Everything
    // below it is open or closed.
    next_acceptable_peer_bidirectional: StreamId,
    next_acceptable_peer_unidirectional: StreamId,

    // Next acceptable stream id that can be opened locally.
    next_acceptable_local_bidirectional: StreamId,
    next_acceptable_local_unidirectional: StreamId,

    // Next stream id to hand out on local creation.
    next_bidirectional_stream_id: StreamId,
    next_unidirectional_stream_id: StreamId,

    // Next stream group id per direction; shares the stream id numbering.
    next_bidirectional_stream_group_id: StreamGroupId,
    next_unidirectional_stream_group_id: StreamGroupId,

    max_local_bidirectional_stream_id: StreamId,
    max_local_unidirectional_stream_id: StreamId,
    max_remote_bidirectional_stream_id: StreamId,
    max_remote_unidirectional_stream_id: StreamId,

    initial_local_bidirectional_stream_id: StreamId,
    initial_local_unidirectional_stream_id: StreamId,
    initial_remote_bidirectional_stream_id: StreamId,
    initial_remote_unidirectional_stream_id: StreamId,

    // Denominator of the closed-stream window that triggers a MAX_STREAMS
    // advertisement.
    stream_limit_windowing_fraction: u64,

    remote_bidirectional_stream_limit_update: Option<u64>,
    remote_unidirectional_stream_limit_update: Option<u64>,

    num_control_streams: u64,

    open_bidirectional_peer_streams: StreamIdSet,
    open_unidirectional_peer_streams: StreamIdSet,
    open_bidirectional_local_streams: StreamIdSet,
    open_unidirectional_local_streams: StreamIdSet,
    open_bidirectional_local_stream_groups: StreamIdSet,
    open_unidirectional_local_stream_groups: StreamIdSet,

    streams: HashMap<StreamId, StreamState>,

    // Recently opened peer streams, in arrival order.
    new_peer_streams: Vec<StreamId>,
    // Recently opened peer streams that carried a group.
    new_grouped_peer_streams: Vec<StreamId>,
    // Peer stream groups not yet surfaced to the application.
    new_peer_stream_groups: Vec<StreamGroupId>,

    peer_bidirectional_stream_groups_seen: StreamIdSet,
    peer_unidirectional_stream_groups_seen: StreamIdSet,

    blocked_streams: HashMap<StreamId, StreamDataBlockedFrame>,
    streams_blocked: Vec<StreamsBlockedFrame>,
    stop_sending_streams: HashMap<StreamId, ApplicationErrorCode>,
    window_updates: HashSet<StreamId>,
    flow_control_updated: HashSet<StreamId>,

    loss_streams: HashSet<StreamId>,
    loss_dsr_streams: HashSet<StreamId>,

    readable_streams: HashSet<StreamId>,
    // Split out when unidirectional_streams_read_callbacks_first is set so
    // unidirectional read callbacks dispatch first.
    unidirectional_readable_streams: HashSet<StreamId>,
    peekable_streams: HashSet<StreamId>,

    write_queue: PriorityQueue,
    control_write_queue: BTreeSet<StreamId>,
    writable_streams: HashSet<StreamId>,
    writable_dsr_streams: HashSet<StreamId>,

    tx_streams: HashSet<StreamId>,
    deliverable_streams: HashSet<StreamId>,

    // Streams fully terminal but not yet reaped by the connection loop.
    closed_streams: HashSet<StreamId>,

    is_app_idle: bool,
    app_idle_changed: Option<bool>,

    max_local_bidirectional_stream_id_increased: bool,
    max_local_unidirectional_stream_id_increased: bool,
}

impl StreamManager {
    pub fn new(side: Side, settings: &TransportSettings) -> Self {
        let (
            next_acceptable_peer_bidirectional,
            next_acceptable_peer_unidirectional,
            next_acceptable_local_bidirectional,
            next_acceptable_local_unidirectional,
        ) = match side {
            Side::Server => (StreamId(0x00), StreamId(0x02), StreamId(0x01), StreamId(0x03)),
            Side::Client => (StreamId(0x01), StreamId(0x03), StreamId(0x00), StreamId(0x02)),
        };
        let initial_local_bidirectional = next_acceptable_local_bidirectional;
        let initial_local_unidirectional = next_acceptable_local_unidirectional;
        let initial_remote_bidirectional = next_acceptable_peer_bidirectional;
        let initial_remote_unidirectional = next_acceptable_peer_unidirectional;

        let mut manager = Self {
            side,
            settings: settings.clone(),
            next_acceptable_peer_bidirectional,
            next_acceptable_peer_unidirectional,
            next_acceptable_local_bidirectional,
            next_acceptable_local_unidirectional,
            next_bidirectional_stream_id: initial_local_bidirectional,
            next_unidirectional_stream_id: initial_local_unidirectional,
            next_bidirectional_stream_group_id: initial_local_bidirectional,
            next_unidirectional_stream_group_id: initial_local_unidirectional,
            max_local_bidirectional_stream_id: initial_local_bidirectional,
            max_local_unidirectional_stream_id: initial_local_unidirectional,
            max_remote_bidirectional_stream_id: initial_remote_bidirectional,
            max_remote_unidirectional_stream_id: initial_remote_unidirectional,
            initial_local_bidirectional_stream_id: initial_local_bidirectional,
            initial_local_unidirectional_stream_id: initial_local_unidirectional,
            initial_remote_bidirectional_stream_id: initial_remote_bidirectional,
            initial_remote_unidirectional_stream_id: initial_remote_unidirectional,
            stream_limit_windowing_fraction: 2,
            remote_bidirectional_stream_limit_update: None,
            remote_unidirectional_stream_limit_update: None,
            num_control_streams: 0,
            open_bidirectional_peer_streams: StreamIdSet::new(initial_remote_bidirectional),
            open_unidirectional_peer_streams: StreamIdSet::new(initial_remote_unidirectional),
            open_bidirectional_local_streams: StreamIdSet::new(initial_local_bidirectional),
            open_unidirectional_local_streams: StreamIdSet::new(initial_local_unidirectional),
            open_bidirectional_local_stream_groups: StreamIdSet::new(initial_local_bidirectional),
            open_unidirectional_local_stream_groups: StreamIdSet::new(
                initial_local_unidirectional,
            ),
            streams: HashMap::new(),
            new_peer_streams: Vec::new(),
            new_grouped_peer_streams: Vec::new(),
            new_peer_stream_groups: Vec::new(),
            peer_bidirectional_stream_groups_seen: StreamIdSet::new(initial_remote_bidirectional),
            peer_unidirectional_stream_groups_seen: StreamIdSet::new(
                initial_remote_unidirectional,
            ),
            blocked_streams: HashMap::new(),
            streams_blocked: Vec::new(),
            stop_sending_streams: HashMap::new(),
            window_updates: HashSet::new(),
            flow_control_updated: HashSet::new(),
            loss_streams: HashSet::new(),
            loss_dsr_streams: HashSet::new(),
            readable_streams: HashSet::new(),
            unidirectional_readable_streams: HashSet::new(),
            peekable_streams: HashSet::new(),
            write_queue: PriorityQueue::new(),
            control_write_queue: BTreeSet::new(),
            writable_streams: HashSet::new(),
            writable_dsr_streams: HashSet::new(),
            tx_streams: HashSet::new(),
            deliverable_streams: HashSet::new(),
            closed_streams: HashSet::new(),
            // No streams at all means idle.
            is_app_idle: true,
            app_idle_changed: None,
            max_local_bidirectional_stream_id_increased: false,
            max_local_unidirectional_stream_id_increased: false,
        };
        manager.refresh_transport_settings(settings);
        manager
    }

    /// Rehome an existing manager into a new connection context.
    ///
    /// Stream records carry no connection back-reference (connection-scoped
    /// state is always a method parameter), so migration is a bulk move of
    /// the maps and sets plus rebinding the settings.
    pub fn migrate(side: Side, settings: &TransportSettings, other: StreamManager) -> Self {
        let mut manager = other;
        manager.side = side;
        manager.settings = settings.clone();
        manager
            .write_queue
            .set_writes_per_stream(settings.priority_queue_writes_per_stream);
        if settings.stream_limit_windowing_fraction > 0 {
            manager.stream_limit_windowing_fraction = settings.stream_limit_windowing_fraction;
        }
        manager
    }

    /// Apply (or re-apply) transport settings: our advertised limits bound
    /// peer streams, the peer's limits (once known) bound local streams.
    pub fn refresh_transport_settings(&mut self, settings: &TransportSettings) {
        self.settings = settings.clone();
        if settings.stream_limit_windowing_fraction > 0 {
            self.stream_limit_windowing_fraction = settings.stream_limit_windowing_fraction;
        }
        self.write_queue
            .set_writes_per_stream(settings.priority_queue_writes_per_stream);
        self.set_max_remote_bidirectional_streams_internal(
            settings.advertised_initial_max_streams_bidi,
            true,
        );
        self.set_max_remote_unidirectional_streams_internal(
            settings.advertised_initial_max_streams_uni,
            true,
        );
        if let Some(n) = settings.peer_initial_max_streams_bidi {
            self.set_max_local_bidirectional_streams(n, true);
        }
        if let Some(n) = settings.peer_initial_max_streams_uni {
            self.set_max_local_unidirectional_streams(n, true);
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    // ======================================================================
    // Local stream creation
    // ======================================================================

    /// Create the state for a specific local stream if it does not exist
    /// yet, implicitly opening lower IDs of the same type.
    pub fn create_stream(
        &mut self,
        stream_id: StreamId,
        group_id: Option<StreamGroupId>,
    ) -> Result<&mut StreamState> {
        if !stream_id.is_local_for(self.side) {
            return Err(StreamError::InvalidStreamId);
        }
        self.check_local_group(stream_id, group_id)?;
        if self.streams.contains_key(&stream_id) {
            return Ok(self.streams.get_mut(&stream_id).expect("checked above"));
        }

        let uni = stream_id.is_unidirectional();
        let max = if uni {
            self.max_local_unidirectional_stream_id
        } else {
            self.max_local_bidirectional_stream_id
        };
        if stream_id >= max {
            return Err(StreamError::StreamLimitReached);
        }

        let next_acceptable = if uni {
            self.next_acceptable_local_unidirectional
        } else {
            self.next_acceptable_local_bidirectional
        };
        let mut opened = next_acceptable;
        while opened <= stream_id {
            let open_set = if uni {
                &mut self.open_unidirectional_local_streams
            } else {
                &mut self.open_bidirectional_local_streams
            };
            open_set.add(opened);
            let group = if opened == stream_id { group_id } else { None };
            self.streams
                .insert(opened, StreamState::new(opened, group, self.side));
            opened = opened.next();
        }
        if uni {
            self.next_acceptable_local_unidirectional = stream_id.next();
            if self.next_unidirectional_stream_id <= stream_id {
                self.next_unidirectional_stream_id = stream_id.next();
            }
        } else {
            self.next_acceptable_local_bidirectional = stream_id.next();
            if self.next_bidirectional_stream_id <= stream_id {
                self.next_bidirectional_stream_id = stream_id.next();
            }
        }
        self.update_app_idle_state();
        Ok(self.streams.get_mut(&stream_id).expect("just inserted"))
    }

    /// Create and return the state for the next available bidirectional
    /// stream.
    pub fn create_next_bidirectional_stream(
        &mut self,
        group_id: Option<StreamGroupId>,
    ) -> Result<&mut StreamState> {
        let id = self.next_bidirectional_stream_id;
        if id == self.max_local_bidirectional_stream_id {
            self.queue_streams_blocked(StreamDirection::Bidirectional);
            return Err(StreamError::StreamLimitReached);
        }
        self.create_stream(id, group_id)
    }

    /// Create and return the state for the next available unidirectional
    /// stream.
    pub fn create_next_unidirectional_stream(
        &mut self,
        group_id: Option<StreamGroupId>,
    ) -> Result<&mut StreamState> {
        let id = self.next_unidirectional_stream_id;
        if id == self.max_local_unidirectional_stream_id {
            self.queue_streams_blocked(StreamDirection::Unidirectional);
            return Err(StreamError::StreamLimitReached);
        }
        self.create_stream(id, group_id)
    }

    /// Create a new bidirectional stream group.
    pub fn create_next_bidirectional_stream_group(&mut self) -> Result<StreamGroupId> {
        let initial = self.initial_local_bidirectional_stream_id;
        let group_id = self.next_bidirectional_stream_group_id;
        if (group_id.value() - initial.value()) / STREAM_INCREMENT >= MAX_STREAM_GROUPS {
            return Err(StreamError::GroupLimitReached);
        }
        self.open_bidirectional_local_stream_groups.add(group_id);
        self.next_bidirectional_stream_group_id = group_id.next();
        Ok(group_id)
    }

    /// Create a new unidirectional stream group.
    pub fn create_next_unidirectional_stream_group(&mut self) -> Result<StreamGroupId> {
        let initial = self.initial_local_unidirectional_stream_id;
        let group_id = self.next_unidirectional_stream_group_id;
        if (group_id.value() - initial.value()) / STREAM_INCREMENT >= MAX_STREAM_GROUPS {
            return Err(StreamError::GroupLimitReached);
        }
        self.open_unidirectional_local_stream_groups.add(group_id);
        self.next_unidirectional_stream_group_id = group_id.next();
        Ok(group_id)
    }

    fn check_local_group(
        &self,
        stream_id: StreamId,
        group_id: Option<StreamGroupId>,
    ) -> Result<()> {
        let Some(group_id) = group_id else {
            return Ok(());
        };
        if group_id.value() & 0x03 != stream_id.value() & 0x03 {
            return Err(StreamError::GroupUnknown);
        }
        let groups = if stream_id.is_unidirectional() {
            &self.open_unidirectional_local_stream_groups
        } else {
            &self.open_bidirectional_local_stream_groups
        };
        if !groups.contains(group_id) {
            return Err(StreamError::GroupUnknown);
        }
        Ok(())
    }

    fn queue_streams_blocked(&mut self, direction: StreamDirection) {
        let (max, initial) = match direction {
            StreamDirection::Bidirectional => (
                self.max_local_bidirectional_stream_id,
                self.initial_local_bidirectional_stream_id,
            ),
            StreamDirection::Unidirectional => (
                self.max_local_unidirectional_stream_id,
                self.initial_local_unidirectional_stream_id,
            ),
        };
        let stream_limit = (max.value() - initial.value()) / STREAM_INCREMENT;
        if !self
            .streams_blocked
            .iter()
            .any(|frame| frame.direction == direction)
        {
            self.streams_blocked.push(StreamsBlockedFrame {
                direction,
                stream_limit,
            });
        }
    }

    /// Pending STREAMS_BLOCKED records; consuming clears them.
    pub fn consume_streams_blocked(&mut self) -> Vec<StreamsBlockedFrame> {
        std::mem::take(&mut self.streams_blocked)
    }

    // ======================================================================
    // Peer stream lookup / implicit open
    // ======================================================================

    /// Return the stream state for `stream_id`, creating it if the stream
    /// is open but its state has not been created yet.
    ///
    /// Peer-initiated IDs route through the implicit-open path; closed peer
    /// streams yield `Ok(None)`. Local IDs must already exist.
    pub fn get_stream(
        &mut self,
        stream_id: StreamId,
        group_id: Option<StreamGroupId>,
    ) -> Result<Option<&mut StreamState>> {
        if stream_id.is_peer_for(self.side) {
            self.get_or_create_peer_stream(stream_id, group_id)
        } else if self.streams.contains_key(&stream_id) {
            Ok(self.streams.get_mut(&stream_id))
        } else {
            Err(StreamError::StreamNotFound)
        }
    }

    /// Find an open, active stream without creating anything.
    pub fn find_stream(&mut self, stream_id: StreamId) -> Option<&mut StreamState> {
        self.streams.get_mut(&stream_id)
    }

    pub fn stream_exists(&self, stream_id: StreamId) -> bool {
        self.streams.contains_key(&stream_id)
    }

    fn get_or_create_peer_stream(
        &mut self,
        stream_id: StreamId,
        group_id: Option<StreamGroupId>,
    ) -> Result<Option<&mut StreamState>> {
        if !stream_id.is_peer_for(self.side) {
            return Err(StreamError::InvalidStreamId);
        }
        if let Some(group_id) = group_id {
            if group_id.value() & 0x03 != stream_id.value() & 0x03 {
                return Err(StreamError::InvalidStreamId);
            }
            let initial = if stream_id.is_unidirectional() {
                self.initial_remote_unidirectional_stream_id
            } else {
                self.initial_remote_bidirectional_stream_id
            };
            if (group_id.value() - initial.value()) / STREAM_INCREMENT >= MAX_STREAM_GROUPS {
                return Err(StreamError::GroupLimitReached);
            }
        }

        if self.streams.contains_key(&stream_id) {
            return Ok(self.streams.get_mut(&stream_id));
        }

        let uni = stream_id.is_unidirectional();
        let next_acceptable = if uni {
            self.next_acceptable_peer_unidirectional
        } else {
            self.next_acceptable_peer_bidirectional
        };
        if stream_id < next_acceptable {
            // Previously opened and since reaped.
            return Ok(None);
        }

        let max = if uni {
            self.max_remote_unidirectional_stream_id
        } else {
            self.max_remote_bidirectional_stream_id
        };
        if stream_id >= max {
            return Err(StreamError::StreamLimitExceeded);
        }

        // A peer may use stream N before N-4: every ID in between becomes
        // implicitly open.
        let mut opened = next_acceptable;
        while opened <= stream_id {
            let open_set = if uni {
                &mut self.open_unidirectional_peer_streams
            } else {
                &mut self.open_bidirectional_peer_streams
            };
            open_set.add(opened);
            let group = if opened == stream_id { group_id } else { None };
            self.instantiate_peer_stream(opened, group);
            opened = opened.next();
        }
        if uni {
            self.next_acceptable_peer_unidirectional = stream_id.next();
        } else {
            self.next_acceptable_peer_bidirectional = stream_id.next();
        }
        self.update_app_idle_state();
        Ok(self.streams.get_mut(&stream_id))
    }

    fn instantiate_peer_stream(&mut self, stream_id: StreamId, group_id: Option<StreamGroupId>) {
        if let Some(group_id) = group_id {
            let seen = if stream_id.is_unidirectional() {
                &mut self.peer_unidirectional_stream_groups_seen
            } else {
                &mut self.peer_bidirectional_stream_groups_seen
            };
            if !seen.contains(group_id) {
                seen.add(group_id);
                self.new_peer_stream_groups.push(group_id);
            }
            self.new_grouped_peer_streams.push(stream_id);
        } else {
            self.new_peer_streams.push(stream_id);
        }
        self.streams
            .insert(stream_id, StreamState::new(stream_id, group_id, self.side));
    }

    // ======================================================================
    // Stream closure
    // ======================================================================

    /// Remove all state for a stream that has reached terminal state in
    /// both directions.
    ///
    /// # Panics
    /// Panics if the stream does not exist (double close) or either half is
    /// not terminal; both are programmer errors.
    pub fn remove_closed_stream(&mut self, stream_id: StreamId) {
        let stream = self
            .streams
            .remove(&stream_id)
            .unwrap_or_else(|| panic!("removing unknown stream {stream_id}"));
        assert!(
            stream.is_closed(),
            "removing stream {stream_id} before both halves are terminal"
        );

        self.readable_streams.remove(&stream_id);
        self.unidirectional_readable_streams.remove(&stream_id);
        self.peekable_streams.remove(&stream_id);
        self.writable_streams.remove(&stream_id);
        self.writable_dsr_streams.remove(&stream_id);
        self.write_queue.erase(stream_id);
        self.control_write_queue.remove(&stream_id);
        self.blocked_streams.remove(&stream_id);
        self.stop_sending_streams.remove(&stream_id);
        self.window_updates.remove(&stream_id);
        self.flow_control_updated.remove(&stream_id);
        self.loss_streams.remove(&stream_id);
        self.loss_dsr_streams.remove(&stream_id);
        self.tx_streams.remove(&stream_id);
        self.deliverable_streams.remove(&stream_id);
        self.closed_streams.remove(&stream_id);

        if stream.is_control {
            self.num_control_streams -= 1;
        }

        if stream_id.is_peer_for(self.side) {
            if stream_id.is_unidirectional() {
                self.open_unidirectional_peer_streams.remove(stream_id);
            } else {
                self.open_bidirectional_peer_streams.remove(stream_id);
            }
            self.maybe_queue_remote_limit_update(stream_id.is_unidirectional());
        } else if stream_id.is_unidirectional() {
            self.open_unidirectional_local_streams.remove(stream_id);
        } else {
            self.open_bidirectional_local_streams.remove(stream_id);
        }

        self.update_app_idle_state();
    }

    // Once enough of the advertised window has drained, queue the next
    // MAX_STREAMS value: streams consumed so far plus the full window.
    fn maybe_queue_remote_limit_update(&mut self, uni: bool) {
        let initial_limit = if uni {
            self.settings.advertised_initial_max_streams_uni
        } else {
            self.settings.advertised_initial_max_streams_bidi
        };
        let window = initial_limit / self.stream_limit_windowing_fraction;
        let openable = if uni {
            self.openable_remote_unidirectional_streams()
        } else {
            self.openable_remote_bidirectional_streams()
        };
        if openable <= initial_limit.saturating_sub(window) {
            let (next_acceptable, initial) = if uni {
                (
                    self.next_acceptable_peer_unidirectional,
                    self.initial_remote_unidirectional_stream_id,
                )
            } else {
                (
                    self.next_acceptable_peer_bidirectional,
                    self.initial_remote_bidirectional_stream_id,
                )
            };
            let consumed = (next_acceptable.value() - initial.value()) / STREAM_INCREMENT;
            let update = consumed + initial_limit;
            if uni {
                self.remote_unidirectional_stream_limit_update = Some(update);
            } else {
                self.remote_bidirectional_stream_limit_update = Some(update);
            }
        }
    }

    /// Drop every open stream and all derived state. Used at teardown.
    pub fn clear_open_streams(&mut self) {
        self.streams.clear();
        self.open_bidirectional_peer_streams.clear();
        self.open_unidirectional_peer_streams.clear();
        self.open_bidirectional_local_streams.clear();
        self.open_unidirectional_local_streams.clear();
        self.new_peer_streams.clear();
        self.new_grouped_peer_streams.clear();
        self.new_peer_stream_groups.clear();
        self.blocked_streams.clear();
        self.streams_blocked.clear();
        self.stop_sending_streams.clear();
        self.window_updates.clear();
        self.flow_control_updated.clear();
        self.loss_streams.clear();
        self.loss_dsr_streams.clear();
        self.readable_streams.clear();
        self.unidirectional_readable_streams.clear();
        self.peekable_streams.clear();
        self.write_queue.clear();
        self.control_write_queue.clear();
        self.writable_streams.clear();
        self.writable_dsr_streams.clear();
        self.tx_streams.clear();
        self.deliverable_streams.clear();
        self.closed_streams.clear();
        self.num_control_streams = 0;
        self.update_app_idle_state();
    }

    // ======================================================================
    // Stream limits
    // ======================================================================

    pub fn openable_local_bidirectional_streams(&self) -> u64 {
        debug_assert!(
            self.max_local_bidirectional_stream_id >= self.next_acceptable_local_bidirectional
        );
        (self.max_local_bidirectional_stream_id.value()
            - self.next_acceptable_local_bidirectional.value())
            / STREAM_INCREMENT
    }

    pub fn openable_local_unidirectional_streams(&self) -> u64 {
        debug_assert!(
            self.max_local_unidirectional_stream_id >= self.next_acceptable_local_unidirectional
        );
        (self.max_local_unidirectional_stream_id.value()
            - self.next_acceptable_local_unidirectional.value())
            / STREAM_INCREMENT
    }

    pub fn openable_remote_bidirectional_streams(&self) -> u64 {
        debug_assert!(
            self.max_remote_bidirectional_stream_id >= self.next_acceptable_peer_bidirectional
        );
        (self.max_remote_bidirectional_stream_id.value()
            - self.next_acceptable_peer_bidirectional.value())
            / STREAM_INCREMENT
    }

    pub fn openable_remote_unidirectional_streams(&self) -> u64 {
        debug_assert!(
            self.max_remote_unidirectional_stream_id >= self.next_acceptable_peer_unidirectional
        );
        (self.max_remote_unidirectional_stream_id.value()
            - self.next_acceptable_peer_unidirectional.value())
            / STREAM_INCREMENT
    }

    /// Next usable peer bidirectional stream ID, if below the limit.
    pub fn next_acceptable_peer_bidirectional_stream_id(&self) -> Option<StreamId> {
        (self.next_acceptable_peer_bidirectional < self.max_remote_bidirectional_stream_id)
            .then_some(self.next_acceptable_peer_bidirectional)
    }

    /// Next usable peer unidirectional stream ID, if below the limit.
    pub fn next_acceptable_peer_unidirectional_stream_id(&self) -> Option<StreamId> {
        (self.next_acceptable_peer_unidirectional < self.max_remote_unidirectional_stream_id)
            .then_some(self.next_acceptable_peer_unidirectional)
    }

    /// Next usable local bidirectional stream ID, if below the limit.
    pub fn next_acceptable_local_bidirectional_stream_id(&self) -> Option<StreamId> {
        (self.next_acceptable_local_bidirectional < self.max_local_bidirectional_stream_id)
            .then_some(self.next_acceptable_local_bidirectional)
    }

    /// Next usable local unidirectional stream ID, if below the limit.
    pub fn next_acceptable_local_unidirectional_stream_id(&self) -> Option<StreamId> {
        (self.next_acceptable_local_unidirectional < self.max_local_unidirectional_stream_id)
            .then_some(self.next_acceptable_local_unidirectional)
    }

    /// Set the max number of local bidirectional streams. Can only increase
    /// unless `force` is set.
    pub fn set_max_local_bidirectional_streams(&mut self, max_streams: u64, force: bool) {
        let max_streams = max_streams.min(MAX_STREAMS_COUNT);
        let new_max = StreamId(
            self.initial_local_bidirectional_stream_id.value()
                + max_streams * STREAM_INCREMENT,
        );
        if !force && new_max < self.max_local_bidirectional_stream_id {
            return;
        }
        if new_max > self.max_local_bidirectional_stream_id {
            self.max_local_bidirectional_stream_id_increased = true;
        }
        self.max_local_bidirectional_stream_id = new_max;
    }

    /// Set the max number of local unidirectional streams. Can only increase
    /// unless `force` is set.
    pub fn set_max_local_unidirectional_streams(&mut self, max_streams: u64, force: bool) {
        let max_streams = max_streams.min(MAX_STREAMS_COUNT);
        let new_max = StreamId(
            self.initial_local_unidirectional_stream_id.value()
                + max_streams * STREAM_INCREMENT,
        );
        if !force && new_max < self.max_local_unidirectional_stream_id {
            return;
        }
        if new_max > self.max_local_unidirectional_stream_id {
            self.max_local_unidirectional_stream_id_increased = true;
        }
        self.max_local_unidirectional_stream_id = new_max;
    }

    /// Set the max number of peer-openable bidirectional streams.
    pub fn set_max_remote_bidirectional_streams(&mut self, max_streams: u64) {
        self.set_max_remote_bidirectional_streams_internal(max_streams, false);
    }

    /// Set the max number of peer-openable unidirectional streams.
    pub fn set_max_remote_unidirectional_streams(&mut self, max_streams: u64) {
        self.set_max_remote_unidirectional_streams_internal(max_streams, false);
    }

    fn set_max_remote_bidirectional_streams_internal(&mut self, max_streams: u64, force: bool) {
        let max_streams = max_streams.min(MAX_STREAMS_COUNT);
        let new_max = StreamId(
            self.initial_remote_bidirectional_stream_id.value()
                + max_streams * STREAM_INCREMENT,
        );
        if force || new_max > self.max_remote_bidirectional_stream_id {
            self.max_remote_bidirectional_stream_id = new_max;
        }
    }

    fn set_max_remote_unidirectional_streams_internal(&mut self, max_streams: u64, force: bool) {
        let max_streams = max_streams.min(MAX_STREAMS_COUNT);
        let new_max = StreamId(
            self.initial_remote_unidirectional_stream_id.value()
                + max_streams * STREAM_INCREMENT,
        );
        if force || new_max > self.max_remote_unidirectional_stream_id {
            self.max_remote_unidirectional_stream_id = new_max;
        }
    }

    /// True if the local bidirectional limit increased since the last call
    /// (resets the flag).
    pub fn consume_max_local_bidirectional_stream_id_increased(&mut self) -> bool {
        std::mem::take(&mut self.max_local_bidirectional_stream_id_increased)
    }

    /// True if the local unidirectional limit increased since the last call
    /// (resets the flag).
    pub fn consume_max_local_unidirectional_stream_id_increased(&mut self) -> bool {
        std::mem::take(&mut self.max_local_unidirectional_stream_id_increased)
    }

    /// Sets the "window-by" fraction for stream limit updates. Setting two
    /// with an initial limit of 100 queues an update once 50 peer streams
    /// have closed.
    pub fn set_stream_limit_windowing_fraction(&mut self, fraction: u64) {
        if fraction > 0 {
            self.stream_limit_windowing_fraction = fraction;
        }
    }

    /// Next value to send in a bidirectional MAX_STREAMS frame, if any.
    /// Calling consumes the update.
    pub fn remote_bidirectional_stream_limit_update(&mut self) -> Option<u64> {
        self.remote_bidirectional_stream_limit_update.take()
    }

    /// Next value to send in a unidirectional MAX_STREAMS frame, if any.
    /// Calling consumes the update.
    pub fn remote_unidirectional_stream_limit_update(&mut self) -> Option<u64> {
        self.remote_unidirectional_stream_limit_update.take()
    }

    // ======================================================================
    // Frame events from packet processing
    // ======================================================================

    /// STREAM frame arrived: `len` bytes at `offset`, possibly FIN.
    pub fn stream_data_received(
        &mut self,
        stream_id: StreamId,
        group_id: Option<StreamGroupId>,
        offset: StreamOffset,
        len: u64,
        fin: bool,
    ) -> Result<()> {
        match self.get_stream(stream_id, group_id)? {
            Some(stream) => stream.on_frame_received(offset, len, fin),
            // Frame for an already-reaped stream: ignored.
            None => return Ok(()),
        }
        self.update_readable_streams(stream_id);
        self.update_peekable_streams(stream_id);
        Ok(())
    }

    /// RESET_STREAM frame arrived.
    pub fn stream_reset_received(
        &mut self,
        stream_id: StreamId,
        error_code: ApplicationErrorCode,
        final_size: StreamOffset,
    ) -> Result<()> {
        match self.get_stream(stream_id, None)? {
            Some(stream) => stream.on_reset_received(error_code, final_size),
            None => return Ok(()),
        }
        self.window_updates.remove(&stream_id);
        self.update_readable_streams(stream_id);
        self.update_peekable_streams(stream_id);
        Ok(())
    }

    /// STOP_SENDING frame arrived.
    pub fn stop_sending_received(
        &mut self,
        stream_id: StreamId,
        error_code: ApplicationErrorCode,
    ) -> Result<()> {
        if self.get_stream(stream_id, None)?.is_none() {
            return Ok(());
        }
        self.stop_sending_streams.insert(stream_id, error_code);
        Ok(())
    }

    /// MAX_STREAMS frame arrived.
    pub fn max_streams_received(&mut self, direction: StreamDirection, max_streams: u64) {
        match direction {
            StreamDirection::Bidirectional => {
                self.set_max_local_bidirectional_streams(max_streams, false)
            }
            StreamDirection::Unidirectional => {
                self.set_max_local_unidirectional_streams(max_streams, false)
            }
        }
    }

    /// STREAM_DATA_BLOCKED frame arrived: peer stalled on our window, so a
    /// window update for the stream may be due.
    pub fn stream_data_blocked_received(
        &mut self,
        stream_id: StreamId,
        _offset: StreamOffset,
    ) -> Result<()> {
        if self.get_stream(stream_id, None)?.is_none() {
            return Ok(());
        }
        self.queue_window_update(stream_id);
        Ok(())
    }

    /// MAX_STREAM_DATA frame arrived: more send credit for the stream.
    pub fn max_stream_data_received(
        &mut self,
        stream_id: StreamId,
        max_data: StreamOffset,
    ) -> Result<()> {
        let credit_raised = match self.get_stream(stream_id, None)? {
            Some(stream) if max_data > stream.flow_credit => {
                stream.flow_credit = max_data;
                true
            }
            _ => false,
        };
        if credit_raised {
            self.flow_control_updated.insert(stream_id);
            self.blocked_streams.remove(&stream_id);
            self.update_writable_streams(stream_id);
        }
        Ok(())
    }

    // ======================================================================
    // Send-path events from the transport
    // ======================================================================

    /// The application buffered `len` more bytes (and possibly a FIN) for
    /// sending.
    pub fn append_to_send_buffer(&mut self, stream_id: StreamId, len: u64, fin: bool) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_data_buffered(len, fin);
        self.update_writable_streams(stream_id);
        Ok(())
    }

    /// `len` bytes of the stream went onto the wire.
    pub fn data_transmitted(&mut self, stream_id: StreamId, len: u64, fin: bool) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_data_transmitted(len, fin);
        self.update_writable_streams(stream_id);
        self.update_tx_streams(stream_id);
        Ok(())
    }

    /// ACK processing advanced the contiguous acked prefix.
    pub fn data_acked(
        &mut self,
        stream_id: StreamId,
        acked_offset: StreamOffset,
        fin_acked: bool,
    ) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_data_acked(acked_offset, fin_acked);
        self.update_deliverable_streams(stream_id);
        Ok(())
    }

    /// Loss detection declared `len` bytes lost.
    pub fn data_lost(&mut self, stream_id: StreamId, len: u64, dsr: bool) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        if dsr {
            stream.dsr_loss_bytes += len;
        } else {
            stream.loss_bytes += len;
        }
        self.update_loss_streams(stream_id);
        self.update_writable_streams(stream_id);
        Ok(())
    }

    /// `len` bytes left the loss buffer (retransmitted or abandoned).
    pub fn loss_data_retransmitted(
        &mut self,
        stream_id: StreamId,
        len: u64,
        dsr: bool,
    ) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        if dsr {
            stream.dsr_loss_bytes = stream.dsr_loss_bytes.saturating_sub(len);
        } else {
            stream.loss_bytes = stream.loss_bytes.saturating_sub(len);
        }
        self.update_loss_streams(stream_id);
        self.update_writable_streams(stream_id);
        Ok(())
    }

    /// RESET_STREAM went onto the wire for the stream.
    pub fn reset_stream_sent(&mut self, stream_id: StreamId) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_reset_sent();
        self.blocked_streams.remove(&stream_id);
        self.update_loss_streams(stream_id);
        self.update_writable_streams(stream_id);
        Ok(())
    }

    /// The peer acknowledged our RESET_STREAM.
    pub fn reset_stream_acked(&mut self, stream_id: StreamId) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_reset_acked();
        Ok(())
    }

    /// The application consumed `len` contiguous bytes.
    pub fn read_from_stream(&mut self, stream_id: StreamId, len: u64) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_read(len);
        self.update_readable_streams(stream_id);
        self.update_peekable_streams(stream_id);
        Ok(())
    }

    /// The application consumed a pending reset.
    pub fn reset_read_by_app(&mut self, stream_id: StreamId) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.on_reset_read();
        self.update_readable_streams(stream_id);
        self.update_peekable_streams(stream_id);
        Ok(())
    }

    /// Delivery callbacks were issued up to `offset`.
    pub fn deliveries_notified(&mut self, stream_id: StreamId, offset: StreamOffset) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.delivery_notified_offset = stream.delivery_notified_offset.max(offset);
        self.update_deliverable_streams(stream_id);
        Ok(())
    }

    /// Transmit callbacks were issued up to `offset`.
    pub fn transmissions_notified(
        &mut self,
        stream_id: StreamId,
        offset: StreamOffset,
    ) -> Result<()> {
        let stream = self
            .streams
            .get_mut(&stream_id)
            .ok_or(StreamError::StreamNotFound)?;
        stream.tx_notified_offset = stream.tx_notified_offset.max(offset);
        self.update_tx_streams(stream_id);
        Ok(())
    }

    // ======================================================================
    // Derived-set maintenance
    // ======================================================================

    /// Re-derive readable-set membership for the stream.
    pub fn update_readable_streams(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get(&stream_id) else {
            return;
        };
        let readable = stream.has_readable_data();
        let route_unidirectional = stream_id.is_unidirectional()
            && self.settings.unidirectional_streams_read_callbacks_first;
        let (target, other) = if route_unidirectional {
            (
                &mut self.unidirectional_readable_streams,
                &mut self.readable_streams,
            )
        } else {
            (
                &mut self.readable_streams,
                &mut self.unidirectional_readable_streams,
            )
        };
        if readable {
            target.insert(stream_id);
        } else {
            target.remove(&stream_id);
        }
        other.remove(&stream_id);
    }

    /// Re-derive peekable-set membership for the stream.
    pub fn update_peekable_streams(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get(&stream_id) else {
            return;
        };
        if stream.has_peekable_data() {
            self.peekable_streams.insert(stream_id);
        } else {
            self.peekable_streams.remove(&stream_id);
        }
    }

    /// Re-derive writable-set and write-queue membership for the stream.
    /// Streams with loss stay scheduled so retransmissions drain.
    pub fn update_writable_streams(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get(&stream_id) else {
            return;
        };
        let writable = stream.has_writable_data();
        let dsr_writable = stream.has_writable_dsr_data();
        let scheduled =
            writable || dsr_writable || stream.has_loss() || stream.has_dsr_loss();
        let is_control = stream.is_control;
        let priority = stream.priority;

        if writable {
            self.writable_streams.insert(stream_id);
        } else {
            self.writable_streams.remove(&stream_id);
        }
        if dsr_writable {
            self.writable_dsr_streams.insert(stream_id);
        } else {
            self.writable_dsr_streams.remove(&stream_id);
        }

        if scheduled {
            if is_control {
                self.write_queue.erase(stream_id);
                self.control_write_queue.insert(stream_id);
            } else {
                self.control_write_queue.remove(&stream_id);
                self.write_queue.insert_or_update(stream_id, priority);
            }
        } else {
            self.write_queue.erase(stream_id);
            self.control_write_queue.remove(&stream_id);
        }
    }

    fn update_loss_streams(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get(&stream_id) else {
            return;
        };
        if stream.has_loss() {
            self.loss_streams.insert(stream_id);
        } else {
            self.loss_streams.remove(&stream_id);
        }
        if stream.has_dsr_loss() {
            self.loss_dsr_streams.insert(stream_id);
        } else {
            self.loss_dsr_streams.remove(&stream_id);
        }
    }

    fn update_tx_streams(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get(&stream_id) else {
            return;
        };
        if stream.has_tx_data() {
            self.tx_streams.insert(stream_id);
        } else {
            self.tx_streams.remove(&stream_id);
        }
    }

    fn update_deliverable_streams(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get(&stream_id) else {
            return;
        };
        if stream.has_deliverable_data() {
            self.deliverable_streams.insert(stream_id);
        } else {
            self.deliverable_streams.remove(&stream_id);
        }
    }

    // ======================================================================
    // Loss sets
    // ======================================================================

    /// Any type of stream data lost.
    pub fn has_loss(&self) -> bool {
        !self.loss_streams.is_empty() || !self.loss_dsr_streams.is_empty()
    }

    pub fn has_non_dsr_loss(&self) -> bool {
        !self.loss_streams.is_empty()
    }

    pub fn has_dsr_loss(&self) -> bool {
        !self.loss_dsr_streams.is_empty()
    }

    /// Test-only direct insert into the loss set.
    pub fn add_loss(&mut self, stream_id: StreamId) {
        self.loss_streams.insert(stream_id);
    }

    /// Test-only direct removal from both loss sets.
    pub fn remove_loss(&mut self, stream_id: StreamId) {
        self.loss_streams.remove(&stream_id);
        self.loss_dsr_streams.remove(&stream_id);
    }

    pub fn loss_streams(&self) -> &HashSet<StreamId> {
        &self.loss_streams
    }

    pub fn loss_dsr_streams(&self) -> &HashSet<StreamId> {
        &self.loss_dsr_streams
    }

    // ======================================================================
    // Write queues
    // ======================================================================

    /// Update stream priority if the stream exists and the value differs.
    /// Returns whether a change occurred.
    pub fn set_stream_priority(&mut self, stream_id: StreamId, priority: Priority) -> bool {
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return false;
        };
        if stream.priority == priority {
            return false;
        }
        stream.priority = priority;
        self.write_queue.set_priority(stream_id, priority);
        true
    }

    pub fn write_queue(&mut self) -> &mut PriorityQueue {
        &mut self.write_queue
    }

    pub fn control_write_queue(&self) -> &BTreeSet<StreamId> {
        &self.control_write_queue
    }

    pub fn has_writable(&self) -> bool {
        !self.write_queue.is_empty() || !self.control_write_queue.is_empty()
    }

    pub fn has_dsr_writable(&self) -> bool {
        !self.writable_dsr_streams.is_empty()
    }

    pub fn has_non_dsr_writable(&self) -> bool {
        !self.writable_streams.is_empty() || !self.control_write_queue.is_empty()
    }

    pub fn writable_streams(&self) -> &HashSet<StreamId> {
        &self.writable_streams
    }

    pub fn writable_dsr_streams(&self) -> &HashSet<StreamId> {
        &self.writable_dsr_streams
    }

    /// Drop the stream from every write-scheduling structure.
    pub fn remove_writable(&mut self, stream_id: StreamId) {
        let is_control = self
            .streams
            .get(&stream_id)
            .map(|s| s.is_control)
            .unwrap_or(false);
        if is_control {
            self.control_write_queue.remove(&stream_id);
        } else {
            self.write_queue.erase(stream_id);
        }
        self.writable_streams.remove(&stream_id);
        self.writable_dsr_streams.remove(&stream_id);
        self.loss_streams.remove(&stream_id);
        self.loss_dsr_streams.remove(&stream_id);
    }

    pub fn clear_writable(&mut self) {
        self.writable_streams.clear();
        self.writable_dsr_streams.clear();
        self.write_queue.clear();
        self.control_write_queue.clear();
    }

    // ======================================================================
    // Blocked streams
    // ======================================================================

    pub fn blocked_streams(&self) -> &HashMap<StreamId, StreamDataBlockedFrame> {
        &self.blocked_streams
    }

    /// Queue a blocked record for the stream at the given offset.
    pub fn queue_blocked(&mut self, stream_id: StreamId, offset: StreamOffset) {
        self.blocked_streams
            .insert(stream_id, StreamDataBlockedFrame { stream_id, offset });
    }

    pub fn remove_blocked(&mut self, stream_id: StreamId) {
        self.blocked_streams.remove(&stream_id);
    }

    pub fn has_blocked(&self) -> bool {
        !self.blocked_streams.is_empty()
    }

    // ======================================================================
    // Window updates
    // ======================================================================

    pub fn queue_window_update(&mut self, stream_id: StreamId) {
        self.window_updates.insert(stream_id);
    }

    pub fn pending_window_update(&self, stream_id: StreamId) -> bool {
        self.window_updates.contains(&stream_id)
    }

    pub fn remove_window_update(&mut self, stream_id: StreamId) {
        self.window_updates.remove(&stream_id);
    }

    pub fn has_window_updates(&self) -> bool {
        !self.window_updates.is_empty()
    }

    pub fn window_updates(&self) -> &HashSet<StreamId> {
        &self.window_updates
    }

    // ======================================================================
    // Flow-control-updated streams
    // ======================================================================

    pub fn queue_flow_control_updated(&mut self, stream_id: StreamId) {
        self.flow_control_updated.insert(stream_id);
    }

    pub fn pop_flow_control_updated(&mut self) -> Option<StreamId> {
        let id = *self.flow_control_updated.iter().next()?;
        self.flow_control_updated.take(&id)
    }

    pub fn remove_flow_control_updated(&mut self, stream_id: StreamId) {
        self.flow_control_updated.remove(&stream_id);
    }

    pub fn flow_control_updated_contains(&self, stream_id: StreamId) -> bool {
        self.flow_control_updated.contains(&stream_id)
    }

    pub fn consume_flow_control_updated(&mut self) -> Vec<StreamId> {
        self.flow_control_updated.drain().collect()
    }

    pub fn clear_flow_control_updated(&mut self) {
        self.flow_control_updated.clear();
    }

    // ======================================================================
    // Deliverable / TX sets
    // ======================================================================

    pub fn add_deliverable(&mut self, stream_id: StreamId) {
        self.deliverable_streams.insert(stream_id);
    }

    pub fn remove_deliverable(&mut self, stream_id: StreamId) {
        self.deliverable_streams.remove(&stream_id);
    }

    pub fn pop_deliverable(&mut self) -> Option<StreamId> {
        let id = *self.deliverable_streams.iter().next()?;
        self.deliverable_streams.take(&id)
    }

    pub fn has_deliverable(&self) -> bool {
        !self.deliverable_streams.is_empty()
    }

    pub fn deliverable_contains(&self, stream_id: StreamId) -> bool {
        self.deliverable_streams.contains(&stream_id)
    }

    pub fn deliverable_streams(&self) -> &HashSet<StreamId> {
        &self.deliverable_streams
    }

    pub fn add_tx(&mut self, stream_id: StreamId) {
        self.tx_streams.insert(stream_id);
    }

    pub fn remove_tx(&mut self, stream_id: StreamId) {
        self.tx_streams.remove(&stream_id);
    }

    pub fn pop_tx(&mut self) -> Option<StreamId> {
        let id = *self.tx_streams.iter().next()?;
        self.tx_streams.take(&id)
    }

    pub fn has_tx(&self) -> bool {
        !self.tx_streams.is_empty()
    }

    pub fn tx_contains(&self, stream_id: StreamId) -> bool {
        self.tx_streams.contains(&stream_id)
    }

    pub fn tx_streams(&self) -> &HashSet<StreamId> {
        &self.tx_streams
    }

    // ======================================================================
    // Readable / peekable sets
    // ======================================================================

    pub fn readable_streams(&self) -> &HashSet<StreamId> {
        &self.readable_streams
    }

    pub fn readable_unidirectional_streams(&self) -> &HashSet<StreamId> {
        &self.unidirectional_readable_streams
    }

    pub fn peekable_streams(&self) -> &HashSet<StreamId> {
        &self.peekable_streams
    }

    // ======================================================================
    // Closed set
    // ======================================================================

    /// Stage a terminal stream for reaping by the connection loop.
    pub fn add_closed(&mut self, stream_id: StreamId) {
        self.closed_streams.insert(stream_id);
    }

    pub fn closed_streams(&self) -> &HashSet<StreamId> {
        &self.closed_streams
    }

    // ======================================================================
    // Stop sending
    // ======================================================================

    pub fn stop_sending_streams(&self) -> &HashMap<StreamId, ApplicationErrorCode> {
        &self.stop_sending_streams
    }

    pub fn add_stop_sending(&mut self, stream_id: StreamId, error: ApplicationErrorCode) {
        self.stop_sending_streams.insert(stream_id, error);
    }

    pub fn consume_stop_sending(&mut self) -> Vec<(StreamId, ApplicationErrorCode)> {
        self.stop_sending_streams.drain().collect()
    }

    pub fn clear_stop_sending(&mut self) {
        self.stop_sending_streams.clear();
    }

    // ======================================================================
    // New peer streams and groups
    // ======================================================================

    pub fn new_peer_streams(&self) -> &[StreamId] {
        &self.new_peer_streams
    }

    pub fn consume_new_peer_streams(&mut self) -> Vec<StreamId> {
        std::mem::take(&mut self.new_peer_streams)
    }

    pub fn consume_new_grouped_peer_streams(&mut self) -> Vec<StreamId> {
        std::mem::take(&mut self.new_grouped_peer_streams)
    }

    pub fn consume_new_peer_stream_groups(&mut self) -> Vec<StreamGroupId> {
        std::mem::take(&mut self.new_peer_stream_groups)
    }

    pub fn num_bidirectional_groups(&self) -> u64 {
        self.open_bidirectional_local_stream_groups.len()
    }

    pub fn num_unidirectional_groups(&self) -> u64 {
        self.open_unidirectional_local_stream_groups.len()
    }

    pub fn num_new_peer_stream_groups(&self) -> usize {
        self.new_peer_stream_groups.len()
    }

    pub fn num_peer_stream_groups_seen(&self) -> u64 {
        self.peer_bidirectional_stream_groups_seen.len()
            + self.peer_unidirectional_stream_groups_seen.len()
    }

    // ======================================================================
    // Open sets and iteration
    // ======================================================================

    pub fn open_bidirectional_peer_streams(&self) -> &StreamIdSet {
        &self.open_bidirectional_peer_streams
    }

    pub fn open_unidirectional_peer_streams(&self) -> &StreamIdSet {
        &self.open_unidirectional_peer_streams
    }

    pub fn open_bidirectional_local_streams(&self) -> &StreamIdSet {
        &self.open_bidirectional_local_streams
    }

    pub fn open_unidirectional_local_streams(&self) -> &StreamIdSet {
        &self.open_unidirectional_local_streams
    }

    /// Number of streams open and active (state created).
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn streams(&self) -> impl Iterator<Item = (&StreamId, &StreamState)> {
        self.streams.iter()
    }

    /// Call `f` on every currently open stream's state. Bounded by
    /// `stream_count()`; intended for teardown or bulk inspection.
    pub fn stream_state_for_each<F: FnMut(&mut StreamState)>(&mut self, mut f: F) {
        for stream in self.streams.values_mut() {
            f(stream);
        }
    }

    // ======================================================================
    // Control streams and app-idle
    // ======================================================================

    pub fn has_non_ctrl_streams(&self) -> bool {
        self.streams.len() as u64 != self.num_control_streams
    }

    pub fn num_control_streams(&self) -> u64 {
        self.num_control_streams
    }

    /// Track the stream as a control stream: it leaves the priority queue
    /// for the ordered control queue and stops counting against app-idle.
    pub fn set_stream_as_control(&mut self, stream_id: StreamId) {
        let Some(stream) = self.streams.get_mut(&stream_id) else {
            return;
        };
        if !stream.is_control {
            stream.is_control = true;
            self.num_control_streams += 1;
        }
        self.update_writable_streams(stream_id);
        self.update_app_idle_state();
    }

    /// Clear the sets that can trigger API callbacks.
    pub fn clear_actionable(&mut self) {
        self.deliverable_streams.clear();
        self.tx_streams.clear();
        self.readable_streams.clear();
        self.unidirectional_readable_streams.clear();
        self.peekable_streams.clear();
        self.flow_control_updated.clear();
    }

    pub fn is_app_idle(&self) -> bool {
        self.is_app_idle
    }

    /// App-idle flip since the last call, if any. The transport forwards
    /// this to the congestion controller.
    pub fn consume_app_idle_change(&mut self) -> Option<bool> {
        self.app_idle_changed.take()
    }

    // App-idle is "no streams besides control streams". Transitions are
    // recorded so the congestion controller can be notified exactly once
    // per flip.
    fn update_app_idle_state(&mut self) {
        let idle = self.streams.len() as u64 == self.num_control_streams;
        if idle != self.is_app_idle {
            self.is_app_idle = idle;
            self.app_idle_changed = Some(idle);
        }
    }
}
