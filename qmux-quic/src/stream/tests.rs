//! # Stream Manager Tests (RFC 9000 Sections 2, 3, 4.6)
//!
//! Covers the stream lifecycle end to end: implicit peer opens, concurrency
//! limits, MAX_STREAMS windowing, derived-set coherence, control stream
//! isolation, stream groups, and app-idle tracking.

#![cfg(test)]

use crate::error::StreamError;
use crate::stream::manager::StreamManager;
use crate::stream::priority::Priority;
use crate::transport::settings::TransportSettings;
use crate::types::{Side, StreamDirection, StreamId};

fn settings(bidi: u64, uni: u64) -> TransportSettings {
    TransportSettings {
        advertised_initial_max_streams_bidi: bidi,
        advertised_initial_max_streams_uni: uni,
        ..Default::default()
    }
}

fn server(bidi: u64, uni: u64) -> StreamManager {
    StreamManager::new(Side::Server, &settings(bidi, uni))
}

/// Drive both halves of a peer-initiated bidirectional stream to terminal
/// state so it can be reaped.
fn terminate_peer_bidi(manager: &mut StreamManager, id: StreamId) {
    manager.stream_reset_received(id, 0x0, 0).unwrap();
    manager.reset_read_by_app(id).unwrap();
    manager.reset_stream_sent(id).unwrap();
    manager.reset_stream_acked(id).unwrap();
}

mod implicit_open {
    use super::*;

    /// Peer opens stream 8 before 0 and 4: all three become open, in order.
    #[test]
    fn test_peer_opens_higher_id_first() {
        let mut manager = server(100, 100);
        assert!(manager.get_stream(StreamId(8), None).unwrap().is_some());

        assert_eq!(manager.stream_count(), 3);
        let open = manager.open_bidirectional_peer_streams();
        assert!(open.contains(StreamId(0)));
        assert!(open.contains(StreamId(4)));
        assert!(open.contains(StreamId(8)));
        assert_eq!(open.len(), 3);
        assert_eq!(
            manager.consume_new_peer_streams(),
            vec![StreamId(0), StreamId(4), StreamId(8)]
        );
        // Three of the hundred are consumed.
        assert_eq!(manager.openable_remote_bidirectional_streams(), 97);
    }

    #[test]
    fn test_implicitly_opened_streams_are_live() {
        let mut manager = server(100, 100);
        manager
            .stream_data_received(StreamId(16), None, 0, 10, false)
            .unwrap();
        // Data can arrive on an implicitly opened lower stream.
        manager
            .stream_data_received(StreamId(4), None, 0, 5, false)
            .unwrap();
        assert!(manager.readable_streams().contains(&StreamId(4)));
        assert!(manager.readable_streams().contains(&StreamId(16)));
    }

    #[test]
    fn test_wrong_class_group_rejected() {
        let mut manager = server(100, 100);
        // Unidirectional group id on a bidirectional stream.
        let err = manager
            .get_stream(StreamId(0), Some(StreamId(2)))
            .unwrap_err();
        assert_eq!(err, StreamError::InvalidStreamId);
    }

    #[test]
    fn test_closed_peer_stream_returns_none() {
        let mut manager = server(100, 100);
        manager.get_stream(StreamId(0), None).unwrap();
        terminate_peer_bidi(&mut manager, StreamId(0));
        manager.remove_closed_stream(StreamId(0));

        assert!(manager.get_stream(StreamId(0), None).unwrap().is_none());
        // Frames for the reaped stream are ignored, not errors.
        manager
            .stream_data_received(StreamId(0), None, 0, 10, false)
            .unwrap();
        assert!(!manager.readable_streams().contains(&StreamId(0)));
    }

    #[test]
    fn test_local_lookup_never_creates() {
        let mut manager = server(100, 100);
        assert_eq!(
            manager.get_stream(StreamId(1), None).unwrap_err(),
            StreamError::StreamNotFound
        );
    }
}

mod stream_limits {
    use super::*;

    /// Peer ID at the advertised limit must not touch any state.
    #[test]
    fn test_peer_stream_limit_exceeded() {
        let mut manager = server(100, 100);
        // max_remote_bidi is 0x00 + 100 * 4.
        let err = manager.get_stream(StreamId(400), None).unwrap_err();
        assert_eq!(err, StreamError::StreamLimitExceeded);
        assert_eq!(manager.stream_count(), 0);
        assert_eq!(manager.openable_remote_bidirectional_streams(), 100);
        assert!(manager.consume_new_peer_streams().is_empty());
    }

    #[test]
    fn test_local_stream_limit() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(2, false);

        let first = manager.create_next_bidirectional_stream(None).unwrap().id;
        let second = manager.create_next_bidirectional_stream(None).unwrap().id;
        assert_eq!(first, StreamId(1));
        assert_eq!(second, StreamId(5));
        assert_eq!(
            manager.create_next_bidirectional_stream(None).unwrap_err(),
            StreamError::StreamLimitReached
        );

        // Hitting the limit queues a STREAMS_BLOCKED record, once.
        let _ = manager.create_next_bidirectional_stream(None);
        let blocked = manager.consume_streams_blocked();
        assert_eq!(blocked.len(), 1);
        assert_eq!(blocked[0].direction, StreamDirection::Bidirectional);
        assert_eq!(blocked[0].stream_limit, 2);
        assert!(manager.consume_streams_blocked().is_empty());
    }

    #[test]
    fn test_openable_count_arithmetic() {
        let mut manager = server(100, 100);
        manager.set_max_local_unidirectional_streams(10, false);
        for expected_left in (0..10u64).rev() {
            manager.create_next_unidirectional_stream(None).unwrap();
            assert_eq!(manager.openable_local_unidirectional_streams(), expected_left);
        }
        assert!(manager
            .next_acceptable_local_unidirectional_stream_id()
            .is_none());
    }

    #[test]
    fn test_max_streams_frame_raises_local_limit() {
        let mut manager = server(100, 100);
        manager.max_streams_received(StreamDirection::Bidirectional, 5);
        assert!(manager.consume_max_local_bidirectional_stream_id_increased());
        assert!(!manager.consume_max_local_bidirectional_stream_id_increased());
        assert_eq!(manager.openable_local_bidirectional_streams(), 5);

        // A lower value without force is ignored.
        manager.max_streams_received(StreamDirection::Bidirectional, 2);
        assert_eq!(manager.openable_local_bidirectional_streams(), 5);
        assert!(!manager.consume_max_local_bidirectional_stream_id_increased());

        // Forced shrink is allowed (internal/testing path).
        manager.set_max_local_bidirectional_streams(2, true);
        assert_eq!(manager.openable_local_bidirectional_streams(), 2);
    }

    #[test]
    fn test_monotone_next_ids() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(50, false);
        let mut last = None;
        for _ in 0..50 {
            let id = manager.create_next_bidirectional_stream(None).unwrap().id;
            if let Some(prev) = last {
                assert_eq!(id, StreamId(prev + 4));
            }
            last = Some(id.value());
        }
    }
}

mod windowing {
    use super::*;

    /// Closing half the advertised window queues MAX_STREAMS 150, the next
    /// half 200.
    #[test]
    fn test_max_streams_cadence() {
        let mut manager = server(100, 100);
        assert!(manager.remote_bidirectional_stream_limit_update().is_none());

        manager.get_stream(StreamId(196), None).unwrap();
        for id in (0..200u64).step_by(4) {
            terminate_peer_bidi(&mut manager, StreamId(id));
            manager.remove_closed_stream(StreamId(id));
        }
        assert_eq!(
            manager.remote_bidirectional_stream_limit_update(),
            Some(150)
        );
        // The update was consumed.
        assert!(manager.remote_bidirectional_stream_limit_update().is_none());

        // The transport sends MAX_STREAMS 150 and raises the ceiling.
        manager.set_max_remote_bidirectional_streams(150);
        manager.get_stream(StreamId(396), None).unwrap();
        for id in (200..400u64).step_by(4) {
            terminate_peer_bidi(&mut manager, StreamId(id));
            manager.remove_closed_stream(StreamId(id));
        }
        assert_eq!(
            manager.remote_bidirectional_stream_limit_update(),
            Some(200)
        );
    }

    #[test]
    fn test_windowing_fraction_of_four() {
        let mut manager = server(100, 100);
        manager.set_stream_limit_windowing_fraction(4);

        // 24 streams consumed: 76 still openable, above the 75 threshold a
        // quarter-window leaves. Closing them all queues nothing.
        manager.get_stream(StreamId(92), None).unwrap();
        for id in (0..96u64).step_by(4) {
            terminate_peer_bidi(&mut manager, StreamId(id));
            manager.remove_closed_stream(StreamId(id));
        }
        assert!(manager.remote_bidirectional_stream_limit_update().is_none());

        // The 25th consumed stream crosses the threshold on close.
        manager.get_stream(StreamId(96), None).unwrap();
        terminate_peer_bidi(&mut manager, StreamId(96));
        manager.remove_closed_stream(StreamId(96));
        assert_eq!(
            manager.remote_bidirectional_stream_limit_update(),
            Some(125)
        );
    }
}

mod closure {
    use super::*;

    #[test]
    fn test_removed_stream_leaves_every_set() {
        let mut manager = server(100, 100);
        let id = StreamId(0);
        manager.get_stream(id, None).unwrap();

        // Populate as many derived sets as possible.
        manager.stream_data_received(id, None, 0, 100, false).unwrap();
        manager.max_stream_data_received(id, 1_000).unwrap();
        manager.append_to_send_buffer(id, 100, false).unwrap();
        manager.data_transmitted(id, 50, false).unwrap();
        manager.data_acked(id, 25, false).unwrap();
        manager.data_lost(id, 10, false).unwrap();
        manager.queue_blocked(id, 100);
        manager.queue_window_update(id);
        manager.add_stop_sending(id, 0x1);
        manager.add_closed(id);

        terminate_peer_bidi(&mut manager, id);
        manager.remove_closed_stream(id);

        assert!(!manager.stream_exists(id));
        assert!(!manager.readable_streams().contains(&id));
        assert!(!manager.peekable_streams().contains(&id));
        assert!(!manager.writable_streams().contains(&id));
        assert!(!manager.write_queue().contains(id));
        assert!(!manager.control_write_queue().contains(&id));
        assert!(!manager.loss_streams().contains(&id));
        assert!(!manager.has_blocked());
        assert!(!manager.has_window_updates());
        assert!(!manager.deliverable_contains(id));
        assert!(!manager.tx_contains(id));
        assert!(manager.stop_sending_streams().is_empty());
        assert!(manager.closed_streams().is_empty());
        assert!(!manager.open_bidirectional_peer_streams().contains(id));
    }

    #[test]
    fn test_control_stream_removal_decrements_count() {
        let mut manager = server(100, 100);
        let id = StreamId(0);
        manager.get_stream(id, None).unwrap();
        manager.set_stream_as_control(id);
        assert_eq!(manager.num_control_streams(), 1);

        terminate_peer_bidi(&mut manager, id);
        manager.remove_closed_stream(id);
        assert_eq!(manager.num_control_streams(), 0);
    }

    #[test]
    #[should_panic(expected = "unknown stream")]
    fn test_double_close_panics() {
        let mut manager = server(100, 100);
        manager.get_stream(StreamId(0), None).unwrap();
        terminate_peer_bidi(&mut manager, StreamId(0));
        manager.remove_closed_stream(StreamId(0));
        manager.remove_closed_stream(StreamId(0));
    }

    #[test]
    #[should_panic(expected = "terminal")]
    fn test_removing_live_stream_panics() {
        let mut manager = server(100, 100);
        manager.get_stream(StreamId(0), None).unwrap();
        manager.remove_closed_stream(StreamId(0));
    }
}

mod derived_sets {
    use super::*;

    fn writable_local_stream(manager: &mut StreamManager) -> StreamId {
        manager.set_max_local_bidirectional_streams(10, false);
        let id = manager.create_next_bidirectional_stream(None).unwrap().id;
        manager.max_stream_data_received(id, 10_000).unwrap();
        id
    }

    #[test]
    fn test_write_path_set_transitions() {
        let mut manager = server(100, 100);
        let id = writable_local_stream(&mut manager);
        assert!(!manager.has_writable());

        manager.append_to_send_buffer(id, 100, false).unwrap();
        assert!(manager.writable_streams().contains(&id));
        assert!(manager.has_non_dsr_writable());
        assert_eq!(manager.write_queue().peek(), Some(id));

        manager.data_transmitted(id, 100, false).unwrap();
        assert!(!manager.writable_streams().contains(&id));
        assert!(!manager.has_writable());
        assert!(manager.tx_contains(id));

        manager.data_acked(id, 100, false).unwrap();
        assert!(manager.deliverable_contains(id));

        manager.deliveries_notified(id, 100).unwrap();
        assert!(!manager.deliverable_contains(id));
        manager.transmissions_notified(id, 100).unwrap();
        assert!(!manager.tx_contains(id));
    }

    #[test]
    fn test_flow_control_gates_writability() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(10, false);
        let id = manager.create_next_bidirectional_stream(None).unwrap().id;

        manager.append_to_send_buffer(id, 100, false).unwrap();
        // No credit yet.
        assert!(!manager.writable_streams().contains(&id));

        manager.max_stream_data_received(id, 50).unwrap();
        assert!(manager.writable_streams().contains(&id));
        assert!(manager.flow_control_updated_contains(id));
        assert_eq!(manager.consume_flow_control_updated(), vec![id]);
    }

    #[test]
    fn test_loss_keeps_stream_scheduled() {
        let mut manager = server(100, 100);
        let id = writable_local_stream(&mut manager);

        manager.append_to_send_buffer(id, 100, false).unwrap();
        manager.data_transmitted(id, 100, false).unwrap();
        assert!(!manager.has_writable());

        manager.data_lost(id, 40, false).unwrap();
        assert!(manager.has_loss());
        assert!(manager.has_non_dsr_loss());
        assert!(!manager.has_dsr_loss());
        // Nothing new to write, but the queue keeps the stream so the
        // retransmission drains.
        assert_eq!(manager.write_queue().peek(), Some(id));

        manager.loss_data_retransmitted(id, 40, false).unwrap();
        assert!(!manager.has_loss());
        assert!(!manager.has_writable());
    }

    #[test]
    fn test_dsr_sets_mirror_regular_ones() {
        let mut manager = server(100, 100);
        let id = writable_local_stream(&mut manager);
        manager.find_stream(id).unwrap().dsr = true;

        manager.append_to_send_buffer(id, 100, false).unwrap();
        assert!(manager.writable_dsr_streams().contains(&id));
        assert!(!manager.writable_streams().contains(&id));
        assert!(manager.has_dsr_writable());

        manager.data_lost(id, 10, true).unwrap();
        assert!(manager.has_dsr_loss());
        assert!(!manager.has_non_dsr_loss());
    }

    #[test]
    fn test_readable_and_peekable() {
        let mut manager = server(100, 100);
        let id = StreamId(0);

        // Out-of-order data: peekable, not readable.
        manager.stream_data_received(id, None, 100, 50, false).unwrap();
        assert!(!manager.readable_streams().contains(&id));
        assert!(manager.peekable_streams().contains(&id));

        manager.stream_data_received(id, None, 0, 100, false).unwrap();
        assert!(manager.readable_streams().contains(&id));

        manager.read_from_stream(id, 150).unwrap();
        assert!(!manager.readable_streams().contains(&id));
        assert!(!manager.peekable_streams().contains(&id));
    }

    #[test]
    fn test_reset_makes_stream_readable() {
        let mut manager = server(100, 100);
        let id = StreamId(0);
        manager.stream_data_received(id, None, 0, 10, false).unwrap();
        manager.queue_window_update(id);

        manager.stream_reset_received(id, 0x7, 10).unwrap();
        assert!(manager.readable_streams().contains(&id));
        assert!(!manager.pending_window_update(id));

        manager.reset_read_by_app(id).unwrap();
        assert!(!manager.readable_streams().contains(&id));
    }

    #[test]
    fn test_unidirectional_readable_split() {
        let mut settings = settings(100, 100);
        settings.unidirectional_streams_read_callbacks_first = true;
        let mut manager = StreamManager::new(Side::Server, &settings);

        manager
            .stream_data_received(StreamId(2), None, 0, 10, false)
            .unwrap();
        manager
            .stream_data_received(StreamId(0), None, 0, 10, false)
            .unwrap();
        assert!(manager
            .readable_unidirectional_streams()
            .contains(&StreamId(2)));
        assert!(!manager.readable_streams().contains(&StreamId(2)));
        assert!(manager.readable_streams().contains(&StreamId(0)));
    }

    #[test]
    fn test_stop_sending_consumed() {
        let mut manager = server(100, 100);
        manager.stop_sending_received(StreamId(0), 0x10).unwrap();
        manager.stop_sending_received(StreamId(4), 0x11).unwrap();

        let mut pending = manager.consume_stop_sending();
        pending.sort();
        assert_eq!(pending, vec![(StreamId(0), 0x10), (StreamId(4), 0x11)]);
        assert!(manager.stop_sending_streams().is_empty());
    }

    #[test]
    fn test_peer_data_blocked_queues_window_update() {
        let mut manager = server(100, 100);
        manager
            .stream_data_blocked_received(StreamId(0), 1_000)
            .unwrap();
        assert!(manager.pending_window_update(StreamId(0)));
        assert!(manager.has_window_updates());
    }

    #[test]
    fn test_clear_actionable() {
        let mut manager = server(100, 100);
        let id = StreamId(0);
        manager.stream_data_received(id, None, 0, 10, false).unwrap();
        manager.queue_flow_control_updated(id);
        manager.add_tx(id);
        manager.add_deliverable(id);

        manager.clear_actionable();
        assert!(manager.readable_streams().is_empty());
        assert!(manager.peekable_streams().is_empty());
        assert!(!manager.has_tx());
        assert!(!manager.has_deliverable());
        assert!(manager.consume_flow_control_updated().is_empty());
    }
}

mod control_streams {
    use super::*;

    /// A control stream lives in the ordered control queue, never the
    /// priority queue, and does not count against app-idle.
    #[test]
    fn test_control_stream_isolation() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(10, false);
        let id = manager.create_next_bidirectional_stream(None).unwrap().id;
        assert_eq!(id, StreamId(1));
        assert!(manager.has_non_ctrl_streams());
        assert!(!manager.is_app_idle());

        manager.set_stream_as_control(id);
        assert!(!manager.has_non_ctrl_streams());
        assert_eq!(manager.num_control_streams(), 1);
        assert!(manager.is_app_idle());

        manager.max_stream_data_received(id, 1_000).unwrap();
        manager.append_to_send_buffer(id, 10, false).unwrap();
        assert!(manager.control_write_queue().contains(&id));
        assert!(!manager.write_queue().contains(id));
        assert!(manager.has_writable());
    }

    #[test]
    fn test_app_idle_tracks_every_mutation() {
        let mut manager = server(100, 100);
        let check = |manager: &StreamManager| {
            assert_eq!(
                manager.is_app_idle(),
                manager.stream_count() as u64 == manager.num_control_streams()
            );
        };

        check(&manager);
        manager.get_stream(StreamId(0), None).unwrap();
        check(&manager);
        manager.set_stream_as_control(StreamId(0));
        check(&manager);
        manager.get_stream(StreamId(4), None).unwrap();
        check(&manager);
        terminate_peer_bidi(&mut manager, StreamId(4));
        manager.remove_closed_stream(StreamId(4));
        check(&manager);
    }

    #[test]
    fn test_app_idle_flips_are_consumable() {
        let mut manager = server(100, 100);
        assert!(manager.consume_app_idle_change().is_none());

        manager.get_stream(StreamId(0), None).unwrap();
        manager.set_stream_as_control(StreamId(0));
        // Went busy on open, idle again once the only stream became control.
        assert_eq!(manager.consume_app_idle_change(), Some(true));
        assert!(manager.consume_app_idle_change().is_none());
    }
}

mod stream_groups {
    use super::*;

    /// 128 groups per direction; the 129th fails.
    #[test]
    fn test_group_limit() {
        let mut manager = server(100, 100);
        for i in 0..128u64 {
            let group = manager.create_next_bidirectional_stream_group().unwrap();
            assert_eq!(group, StreamId(1 + i * 4));
        }
        assert_eq!(
            manager.create_next_bidirectional_stream_group().unwrap_err(),
            StreamError::GroupLimitReached
        );
        assert_eq!(manager.num_bidirectional_groups(), 128);
    }

    #[test]
    fn test_local_stream_with_unknown_group() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(10, false);
        assert_eq!(
            manager
                .create_next_bidirectional_stream(Some(StreamId(1)))
                .unwrap_err(),
            StreamError::GroupUnknown
        );

        let group = manager.create_next_bidirectional_stream_group().unwrap();
        let stream = manager
            .create_next_bidirectional_stream(Some(group))
            .unwrap();
        assert_eq!(stream.group_id, Some(group));
    }

    #[test]
    fn test_new_peer_stream_groups_tracked() {
        let mut manager = server(100, 100);
        manager
            .stream_data_received(StreamId(4), Some(StreamId(0)), 0, 10, false)
            .unwrap();

        // The grouped terminal stream and the implicitly opened plain one
        // land in different queues.
        assert_eq!(manager.consume_new_peer_streams(), vec![StreamId(0)]);
        assert_eq!(
            manager.consume_new_grouped_peer_streams(),
            vec![StreamId(4)]
        );
        assert_eq!(
            manager.consume_new_peer_stream_groups(),
            vec![StreamId(0)]
        );
        assert_eq!(manager.num_peer_stream_groups_seen(), 1);

        // Same group again: seen, not new.
        manager
            .stream_data_received(StreamId(8), Some(StreamId(0)), 0, 10, false)
            .unwrap();
        assert!(manager.consume_new_peer_stream_groups().is_empty());
    }
}

mod client_role {
    use super::*;

    #[test]
    fn test_client_bases() {
        let mut manager = StreamManager::new(Side::Client, &settings(100, 100));
        manager.set_max_local_bidirectional_streams(10, false);
        manager.set_max_local_unidirectional_streams(10, false);

        assert_eq!(
            manager.create_next_bidirectional_stream(None).unwrap().id,
            StreamId(0)
        );
        assert_eq!(
            manager.create_next_unidirectional_stream(None).unwrap().id,
            StreamId(2)
        );

        // Server-initiated bidi stream 1 is a peer stream for the client.
        assert!(manager.get_stream(StreamId(1), None).unwrap().is_some());
        assert!(manager.open_bidirectional_peer_streams().contains(StreamId(1)));
    }

    #[test]
    fn test_client_rejects_wrong_peer_class() {
        let mut manager = StreamManager::new(Side::Client, &settings(100, 100));
        // Stream 0 is client-initiated: for the client it is local and must
        // exist before lookup.
        assert_eq!(
            manager.get_stream(StreamId(0), None).unwrap_err(),
            StreamError::StreamNotFound
        );
    }
}

mod migration {
    use super::*;

    #[test]
    fn test_migration_preserves_counters_and_streams() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(10, false);
        manager.create_next_bidirectional_stream(None).unwrap();
        manager.get_stream(StreamId(8), None).unwrap();
        manager.set_stream_as_control(StreamId(0));

        let migrated_settings = settings(100, 100);
        let mut manager = StreamManager::migrate(Side::Server, &migrated_settings, manager);

        assert_eq!(manager.stream_count(), 4);
        assert_eq!(manager.num_control_streams(), 1);
        assert_eq!(manager.openable_remote_bidirectional_streams(), 97);
        // Creation resumes where the old manager left off.
        assert_eq!(
            manager.create_next_bidirectional_stream(None).unwrap().id,
            StreamId(5)
        );
    }
}

mod priorities {
    use super::*;

    #[test]
    fn test_set_stream_priority_reports_change() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(10, false);
        let id = manager.create_next_bidirectional_stream(None).unwrap().id;

        assert!(!manager.set_stream_priority(id, Priority::default()));
        assert!(manager.set_stream_priority(id, Priority::new(0, true)));
        assert!(!manager.set_stream_priority(id, Priority::new(0, true)));
        assert!(!manager.set_stream_priority(StreamId(9), Priority::new(0, true)));
    }

    #[test]
    fn test_priority_orders_write_queue() {
        let mut manager = server(100, 100);
        manager.set_max_local_bidirectional_streams(10, false);
        let first = manager.create_next_bidirectional_stream(None).unwrap().id;
        let second = manager.create_next_bidirectional_stream(None).unwrap().id;
        for id in [first, second] {
            manager.max_stream_data_received(id, 1_000).unwrap();
            manager.append_to_send_buffer(id, 100, false).unwrap();
        }

        manager.set_stream_priority(second, Priority::new(0, false));
        assert_eq!(manager.write_queue().peek(), Some(second));
    }
}
