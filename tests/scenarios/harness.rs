/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use tinydag::session::{EditorSession, RecordingTransport};
use tinydag_canvas::{CanvasConfig, Modifiers, PointerButton, ScreenPoint, ScreenRect, ScreenSize};
use tinydag_core::{Connection, GraphSnapshot, GraphStore, Node, NodeId, SyncMessage};

pub type TestSession = EditorSession<RecordingTransport>;

pub fn screen() -> ScreenRect {
    ScreenRect::new(ScreenPoint::origin(), ScreenSize::new(1000.0, 600.0))
}

pub fn snapshot(nodes: &[(NodeId, f64, f64)], connections: &[(NodeId, NodeId)]) -> GraphSnapshot {
    GraphSnapshot {
        nodes: nodes
            .iter()
            .map(|&(id, x, y)| Node::blank(id, x, y))
            .collect(),
        connections: connections
            .iter()
            .map(|&(source, target)| Connection::new(source, target))
            .collect(),
    }
}

pub fn session(snapshot: GraphSnapshot) -> TestSession {
    EditorSession::new(
        GraphStore::from_snapshot(snapshot),
        screen(),
        CanvasConfig::default(),
        RecordingTransport::open(),
    )
}

pub fn press(session: &mut TestSession, x: f64, y: f64) -> bool {
    session.pointer_down(ScreenPoint::new(x, y), PointerButton::Primary, Modifiers::default())
}

pub fn press_middle(session: &mut TestSession, x: f64, y: f64) -> bool {
    session.pointer_down(ScreenPoint::new(x, y), PointerButton::Middle, Modifiers::default())
}

pub fn move_to(session: &mut TestSession, x: f64, y: f64) {
    session.pointer_move(ScreenPoint::new(x, y));
}

pub fn graph_update_frame(snapshot: GraphSnapshot) -> String {
    SyncMessage::graph_update(snapshot)
        .encode()
        .expect("graph_update encodes")
}
