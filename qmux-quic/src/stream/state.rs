//! # Per-Stream State (RFC 9000 Section 3)
//!
//! The record the stream manager keeps for every open stream: both state
//! machines, the priority, and bookkeeping mirrors of the externally-owned
//! send/receive byte buffers. The manager derives its working sets from the
//! predicates at the bottom of this file; the buffers themselves (and every
//! payload byte) live with the transport, never here.

#![forbid(unsafe_code)]

use crate::interval_set::IntervalSet;
use crate::stream::priority::Priority;
use crate::types::{ApplicationErrorCode, Side, StreamGroupId, StreamId, StreamOffset};

/// Stream Send State (RFC 9000 Section 3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendState {
    /// Stream created, no data handed to the transport yet
    Ready,

    /// Sending data
    Send,

    /// All data and FIN sent, waiting for acknowledgment
    DataSent,

    /// All data acknowledged (terminal)
    DataRecvd,

    /// RESET_STREAM sent
    ResetSent,

    /// RESET_STREAM acknowledged (terminal)
    ResetRecvd,
}

impl SendState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SendState::DataRecvd | SendState::ResetRecvd)
    }

    pub fn is_reset(self) -> bool {
        matches!(self, SendState::ResetSent | SendState::ResetRecvd)
    }
}

/// Stream Receive State (RFC 9000 Section 3.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvState {
    /// Receiving data
    Recv,

    /// FIN received, final size known, gaps may remain
    SizeKnown,

    /// All data received, not yet read by the application
    DataRecvd,

    /// All data read by the application (terminal)
    DataRead,

    /// RESET_STREAM received, reset not yet surfaced to the application
    ResetRecvd,

    /// Reset surfaced to the application (terminal)
    ResetRead,
}

impl RecvState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecvState::DataRead | RecvState::ResetRead)
    }

    pub fn is_reset(self) -> bool {
        matches!(self, RecvState::ResetRecvd | RecvState::ResetRead)
    }
}

/// State record for one stream.
///
/// Unidirectional streams only carry one live half; the absent half is
/// constructed already terminal so closure checks stay uniform.
#[derive(Debug, Clone)]
pub struct StreamState {
    pub id: StreamId,
    pub group_id: Option<StreamGroupId>,
    pub is_control: bool,
    pub priority: Priority,

    pub send: SendState,
    pub recv: RecvState,

    // ---- send-side bookkeeping ----
    /// End offset of data the application has buffered for sending.
    pub buffered_offset: StreamOffset,
    /// Application wrote a FIN after `buffered_offset`.
    pub fin_buffered: bool,
    /// Next offset to transmit; everything below has been sent at least once.
    pub sent_offset: StreamOffset,
    pub fin_sent: bool,
    /// Contiguously acknowledged prefix.
    pub acked_offset: StreamOffset,
    pub fin_acked: bool,
    /// Peer-advertised MAX_STREAM_DATA.
    pub flow_credit: StreamOffset,
    /// Bytes sitting in the loss buffer awaiting retransmission.
    pub loss_bytes: u64,
    /// Same, for the delegated (DSR) send path.
    pub dsr_loss_bytes: u64,
    /// Send path delegated to a remote helper.
    pub dsr: bool,
    /// Offset up to which delivery callbacks have been issued.
    pub delivery_notified_offset: StreamOffset,
    /// Offset up to which transmit callbacks have been issued.
    pub tx_notified_offset: StreamOffset,

    // ---- receive-side bookkeeping ----
    /// Byte ranges received so far (offsets only, no payloads).
    pub received: IntervalSet,
    /// Application read cursor.
    pub read_offset: StreamOffset,
    pub final_size: Option<StreamOffset>,
    /// Error code of a RESET_STREAM not yet surfaced to the application.
    pub recv_error: Option<ApplicationErrorCode>,
}

impl StreamState {
    pub fn new(id: StreamId, group_id: Option<StreamGroupId>, side: Side) -> Self {
        let sendable = id.is_bidirectional() || id.is_local_for(side);
        let receivable = id.is_bidirectional() || id.is_peer_for(side);
        Self {
            id,
            group_id,
            is_control: false,
            priority: Priority::default(),
            send: if sendable {
                SendState::Ready
            } else {
                SendState::DataRecvd
            },
            recv: if receivable {
                RecvState::Recv
            } else {
                RecvState::DataRead
            },
            buffered_offset: 0,
            fin_buffered: false,
            sent_offset: 0,
            fin_sent: false,
            acked_offset: 0,
            fin_acked: false,
            flow_credit: 0,
            loss_bytes: 0,
            dsr_loss_bytes: 0,
            dsr: false,
            delivery_notified_offset: 0,
            tx_notified_offset: 0,
            received: IntervalSet::new(),
            read_offset: 0,
            final_size: None,
            recv_error: None,
        }
    }

    // ------------------------------------------------------------------
    // Receive-side transitions
    // ------------------------------------------------------------------

    /// Record a received STREAM frame's byte range.
    pub fn on_frame_received(&mut self, offset: StreamOffset, len: u64, fin: bool) {
        if len > 0 {
            self.received.insert(offset, offset + len - 1);
        }
        if fin {
            self.final_size = Some(offset + len);
            if self.recv == RecvState::Recv {
                self.recv = RecvState::SizeKnown;
            }
        }
        if let Some(final_size) = self.final_size {
            let all_received = final_size == 0
                || self
                    .received
                    .run_end_containing(0)
                    .is_some_and(|end| end + 1 >= final_size);
            if all_received && self.recv == RecvState::SizeKnown {
                self.recv = RecvState::DataRecvd;
            }
        }
    }

    /// Record a received RESET_STREAM.
    pub fn on_reset_received(&mut self, error_code: ApplicationErrorCode, final_size: StreamOffset) {
        if self.recv.is_terminal() {
            return;
        }
        self.final_size = Some(final_size);
        self.recv_error = Some(error_code);
        self.recv = RecvState::ResetRecvd;
    }

    /// Advance the application read cursor.
    pub fn on_read(&mut self, len: u64) {
        self.read_offset += len;
        if self.final_size == Some(self.read_offset)
            && matches!(self.recv, RecvState::DataRecvd | RecvState::SizeKnown)
        {
            self.recv = RecvState::DataRead;
        }
    }

    /// The application consumed the pending reset.
    pub fn on_reset_read(&mut self) {
        if self.recv == RecvState::ResetRecvd {
            self.recv_error = None;
            self.recv = RecvState::ResetRead;
        }
    }

    // ------------------------------------------------------------------
    // Send-side transitions
    // ------------------------------------------------------------------

    /// The application buffered `len` more bytes (and possibly a FIN).
    pub fn on_data_buffered(&mut self, len: u64, fin: bool) {
        self.buffered_offset += len;
        self.fin_buffered |= fin;
        if self.send == SendState::Ready {
            self.send = SendState::Send;
        }
    }

    /// `len` bytes were handed to the wire starting at `sent_offset`.
    pub fn on_data_transmitted(&mut self, len: u64, fin: bool) {
        self.sent_offset += len;
        self.fin_sent |= fin;
        if self.fin_sent && self.sent_offset >= self.buffered_offset && !self.send.is_reset() {
            self.send = SendState::DataSent;
        }
    }

    /// Acknowledgment advanced the contiguous acked prefix.
    pub fn on_data_acked(&mut self, acked_offset: StreamOffset, fin_acked: bool) {
        self.acked_offset = self.acked_offset.max(acked_offset);
        self.fin_acked |= fin_acked;
        if self.send == SendState::DataSent
            && self.fin_acked
            && self.acked_offset >= self.sent_offset
        {
            self.send = SendState::DataRecvd;
        }
    }

    pub fn on_reset_sent(&mut self) {
        if !self.send.is_terminal() {
            self.send = SendState::ResetSent;
            self.loss_bytes = 0;
            self.dsr_loss_bytes = 0;
        }
    }

    pub fn on_reset_acked(&mut self) {
        if self.send == SendState::ResetSent {
            self.send = SendState::ResetRecvd;
        }
    }

    // ------------------------------------------------------------------
    // Derived-set predicates
    // ------------------------------------------------------------------

    /// Deliverable bytes at the current read offset, a pending reset, or
    /// an unconsumed end-of-stream.
    pub fn has_readable_data(&self) -> bool {
        if self.recv == RecvState::ResetRecvd {
            return true;
        }
        if self.recv.is_terminal() {
            return false;
        }
        if self.recv == RecvState::DataRecvd && self.final_size == Some(self.read_offset) {
            return true;
        }
        self.received
            .run_end_containing(self.read_offset)
            .is_some()
    }

    /// Any received bytes not yet consumed, contiguous or not.
    pub fn has_peekable_data(&self) -> bool {
        if self.recv.is_reset() || self.recv.is_terminal() {
            return false;
        }
        self.received.iter().any(|(_, end)| end >= self.read_offset)
    }

    /// Pending payload (or FIN) within flow-control credit, not reset.
    pub fn has_writable_data(&self) -> bool {
        if self.send.is_reset() || self.dsr {
            return false;
        }
        let pending = self.buffered_offset > self.sent_offset
            || (self.fin_buffered && !self.fin_sent);
        pending && self.sent_offset < self.flow_credit
    }

    /// The DSR mirror of [`Self::has_writable_data`].
    pub fn has_writable_dsr_data(&self) -> bool {
        if self.send.is_reset() || !self.dsr {
            return false;
        }
        let pending = self.buffered_offset > self.sent_offset
            || (self.fin_buffered && !self.fin_sent);
        pending && self.sent_offset < self.flow_credit
    }

    /// Acked bytes past the last delivery notification.
    pub fn has_deliverable_data(&self) -> bool {
        self.acked_offset > self.delivery_notified_offset
    }

    /// Newly transmitted bytes past the last transmit notification.
    pub fn has_tx_data(&self) -> bool {
        self.sent_offset > self.tx_notified_offset
    }

    pub fn has_loss(&self) -> bool {
        self.loss_bytes > 0
    }

    pub fn has_dsr_loss(&self) -> bool {
        self.dsr_loss_bytes > 0
    }

    /// Both halves terminal; the stream may be reaped.
    pub fn is_closed(&self) -> bool {
        self.send.is_terminal() && self.recv.is_terminal()
    }
}
