/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use tinydag::session::EditorInput;
use tinydag_canvas::GraphPoint;
use tinydag_core::{Connection, MutationOutcome, NodeEdit};

use crate::harness::{move_to, press, session, snapshot};

#[test]
fn add_node_from_source_publishes_node_and_connection_together() {
    let mut session = session(snapshot(&[(1, 0.0, 0.0)], &[]));

    assert_eq!(session.add_node_from(1), Some(2));

    let published = session.transport().published();
    assert_eq!(published.len(), 1);
    let update = &published[0];
    assert_eq!(update.nodes.len(), 2);
    assert_eq!(update.nodes[1].id, 2);
    assert_eq!(update.nodes[1].position(), GraphPoint::new(300.0, 0.0));
    assert_eq!(update.connections, vec![Connection::new(1, 2)]);
    assert!(session.store().node(2).is_some_and(|node| node.is_new));
    assert_eq!(session.editor().map(|editor| editor.node), Some(2));
    assert_eq!(session.editor().map(|editor| editor.draft.name.as_str()), Some("Node 2"));
}

#[test]
fn removing_node_drops_its_connections_in_one_update() {
    let mut session = session(snapshot(&[(1, 0.0, 0.0)], &[]));
    session.add_node_from(1);
    session.transport_mut().clear();

    assert_eq!(session.remove_node(2), MutationOutcome::Changed);

    let published = session.transport().published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].nodes.len(), 1);
    assert!(published[0].connections.is_empty());
}

#[test]
fn drawing_connection_onto_node_adds_exactly_one_connection() {
    let mut session = session(snapshot(&[(1, 100.0, 100.0), (2, 400.0, 100.0)], &[]));

    assert!(session.begin_connection(1));
    move_to(&mut session, 250.0, 110.0);
    move_to(&mut session, 410.0, 120.0);
    session.pointer_up();

    assert_eq!(session.store().connections(), &[Connection::new(1, 2)]);
    assert_eq!(session.transport().frames().len(), 1);

    // Same gesture again: the pair already exists.
    session.begin_connection(1);
    move_to(&mut session, 410.0, 120.0);
    session.pointer_up();
    assert_eq!(session.store().connections().len(), 1);
    assert_eq!(session.transport().frames().len(), 1);
}

#[test]
fn connection_released_on_source_is_not_a_self_loop() {
    let mut session = session(snapshot(&[(1, 100.0, 100.0), (2, 400.0, 100.0)], &[]));
    session.begin_connection(1);
    move_to(&mut session, 100.0, 100.0);
    session.pointer_up();
    assert!(session.store().connections().is_empty());
    assert!(session.transport().frames().is_empty());
}

#[test]
fn pointer_leave_during_drag_publishes_like_release() {
    let mut session = session(snapshot(&[(1, 100.0, 100.0)], &[]));
    assert!(press(&mut session, 120.0, 90.0));
    move_to(&mut session, 220.0, 190.0);
    session.pointer_leave();

    assert!(session.canvas().is_idle());
    assert!(session.editor().is_none());
    let last = session.transport().last_published().unwrap();
    assert_eq!(last.nodes[0].position(), GraphPoint::new(200.0, 200.0));
}

#[test]
fn edit_round_trip_through_input_script() {
    let mut session = session(snapshot(&[(1, 300.0, 300.0)], &[]));
    let inputs = [
        EditorInput::AddNode { source: 1 },
        EditorInput::OpenEditor { id: 2 },
        EditorInput::SaveEdit {
            edit: NodeEdit {
                name: "Scorer".to_string(),
                code: "score = evaluate(result)".to_string(),
                input: vec!["result".to_string()],
                fitness: Some(0.55),
                ..NodeEdit::default()
            },
        },
    ];
    for input in inputs {
        session.dispatch(input);
    }

    let node = session.store().node(2).unwrap();
    assert_eq!(node.name, "Scorer");
    assert_eq!(node.position(), GraphPoint::new(600.0, 300.0));
    assert!(!node.is_new);
    assert!(session.editor().is_none());
    assert_eq!(session.transport().frames().len(), 2);
}

proptest::proptest! {
    #[test]
    fn drag_result_depends_only_on_final_pointer(
        path in proptest::collection::vec((0.0f64..1000.0, 0.0f64..600.0), 1..12),
    ) {
        let mut session = session(snapshot(&[(1, 100.0, 100.0)], &[]));
        proptest::prop_assert!(press(&mut session, 130.0, 80.0));
        for &(x, y) in &path {
            move_to(&mut session, x, y);
        }
        session.pointer_up();

        let (x, y) = path[path.len() - 1];
        let node = session.store().node(1).unwrap();
        proptest::prop_assert!((node.x - (x - 30.0)).abs() < 1e-9);
        proptest::prop_assert!((node.y - (y + 20.0)).abs() < 1e-9);
        proptest::prop_assert_eq!(session.transport().frames().len(), 1);
    }
}
