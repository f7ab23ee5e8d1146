/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use tinydag::diagnostics::{
    CHANNEL_SYNC_INBOUND_APPLIED, CHANNEL_SYNC_INBOUND_IGNORED_EMPTY,
    CHANNEL_SYNC_OUTBOUND_DROPPED, CHANNEL_SYNC_OUTBOUND_PUBLISHED, DiagnosticsState,
};
use rstest::rstest;
use tinydag::session::InboundOutcome;
use tinydag_canvas::GraphPoint;
use tinydag_core::GraphSnapshot;

use crate::harness::{graph_update_frame, move_to, press_middle, session, snapshot};

#[test]
fn empty_inbound_snapshot_is_a_no_op() {
    let mut diagnostics = DiagnosticsState::capture_current_thread();
    let mut session = session(GraphSnapshot::builtin_default());
    let before = session.store().snapshot();

    let outcome = session.apply_inbound(&graph_update_frame(GraphSnapshot::default()));

    assert_eq!(outcome, InboundOutcome::IgnoredEmpty);
    assert_eq!(session.store().snapshot(), before);
    assert_eq!(diagnostics.count(CHANNEL_SYNC_INBOUND_IGNORED_EMPTY), 1);
    assert_eq!(diagnostics.count(CHANNEL_SYNC_INBOUND_APPLIED), 0);
}

#[test]
fn last_inbound_snapshot_wins_over_local_edits() {
    let mut session = session(snapshot(&[(1, 0.0, 0.0)], &[]));
    session.add_node_from(1);

    let remote = snapshot(&[(1, 50.0, 50.0), (7, 90.0, 90.0)], &[(7, 1)]);
    assert_eq!(session.apply_inbound(&graph_update_frame(remote.clone())), InboundOutcome::Applied);
    assert_eq!(session.store().snapshot(), remote);

    // Ids continue past everything this session has seen.
    assert_eq!(session.add_node_from(7), Some(8));
}

#[rstest]
#[case::chat_message(r#"{"type": "chat_message", "message": "hello"}"#)]
#[case::untagged(r#"{"nodes": [], "connections": []}"#)]
#[case::truncated(r#"{"type": "graph_update", "nodes": ["#)]
#[case::node_without_position(concat!(
    r#"{"type": "graph_update", "nodes": [{"id": 3, "name": "C"}], "#,
    r#""connections": []}"#
))]
fn unusable_inbound_frames_leave_graph_alone(#[case] frame: &str) {
    let mut session = session(GraphSnapshot::builtin_default());
    let before = session.store().snapshot();
    assert_eq!(session.apply_inbound(frame), InboundOutcome::Malformed);
    assert_eq!(session.store().snapshot(), before);
}

#[test]
fn pan_is_local_and_follows_pointer_one_to_one() {
    let mut session = session(snapshot(&[(1, 100.0, 100.0)], &[]));
    assert!(press_middle(&mut session, 600.0, 400.0));
    move_to(&mut session, 637.0, 381.0);
    session.pointer_up();

    assert_eq!(session.viewport().origin, GraphPoint::new(-37.0, 19.0));
    assert!(session.transport().frames().is_empty());
}

#[test]
fn offline_edits_are_dropped_then_resume_when_open() {
    let mut diagnostics = DiagnosticsState::capture_current_thread();
    let mut session = session(snapshot(&[(1, 0.0, 0.0)], &[]));
    session.transport_mut().set_open(false);
    session.add_node_from(1);
    assert!(session.transport().frames().is_empty());
    assert_eq!(diagnostics.count(CHANNEL_SYNC_OUTBOUND_DROPPED), 1);

    session.transport_mut().set_open(true);
    session.add_node_from(2);
    let last = session.transport().last_published().unwrap();
    assert_eq!(last.nodes.len(), 3);
    assert_eq!(diagnostics.count(CHANNEL_SYNC_OUTBOUND_PUBLISHED), 1);
}

#[test]
fn import_replaces_graph_and_export_reads_it_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let original = snapshot(&[(4, 10.0, 20.0), (5, 30.0, 40.0)], &[(4, 5)]);
    std::fs::write(&path, tinydag_core::export_snapshot(&original).unwrap()).unwrap();

    let mut session = session(GraphSnapshot::builtin_default());
    session
        .import_bytes(&std::fs::read(&path).unwrap())
        .unwrap();
    assert_eq!(session.store().snapshot(), original);
    assert_eq!(session.transport().last_published(), Some(original.clone()));

    let exported = session.export_json().unwrap();
    assert_eq!(tinydag_core::parse_import(exported.as_bytes()).unwrap(), original);
}
