/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Editor session: the single owner of the graph store, the canvas state
//! and the synchronization transport.
//!
//! Every pointer event and node control goes through [`EditorSession`].
//! Local mutations are applied to the store first and then published as one
//! full `graph_update` snapshot. Inbound snapshots replace the store wholesale
//! unless they carry no nodes.

pub mod input;
pub mod transport;

use tinydag_canvas::{
    CanvasConfig, CanvasState, ConnectionPath, GestureEffect, GraphVector, Modifiers,
    PointerButton, ReleaseCause, ScreenPoint, ScreenRect, ScreenSize, StatusColor, Viewport,
    connection_path,
};
use tinydag_core::{
    GraphIntent, GraphStore, ImportError, MutationOutcome, NodeEdit, NodeId, RenderedConnection,
    ReplaceOutcome, SyncMessage, export_snapshot, parse_import,
};

use crate::diagnostics::{
    CHANNEL_GRAPH_CONNECTION_REJECTED, CHANNEL_GRAPH_IMPORT_REJECTED,
    CHANNEL_SYNC_INBOUND_APPLIED, CHANNEL_SYNC_INBOUND_IGNORED_EMPTY,
    CHANNEL_SYNC_INBOUND_MALFORMED, CHANNEL_SYNC_OUTBOUND_DROPPED,
    CHANNEL_SYNC_OUTBOUND_PUBLISHED, emit_received, emit_sent,
};

pub use input::{EditorInput, ScriptError, parse_script};
pub use transport::{OfflineTransport, RecordingTransport, SyncTransport};

pub const EDIT_FORM_WIDTH: f64 = 384.0;
pub const EDIT_FORM_MAX_HEIGHT: f64 = 600.0;
const EDIT_FORM_HEIGHT_RATIO: f64 = 0.8;
const EDIT_FORM_MARGIN: f64 = 20.0;

/// Open modal edit form for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSurface {
    pub node: NodeId,
    /// Top-left corner of the form, kept inside the screen.
    pub anchor: ScreenPoint,
    pub size: ScreenSize,
    pub draft: NodeEdit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    Applied,
    IgnoredEmpty,
    Malformed,
}

/// Per-node draw data in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub center: ScreenPoint,
    pub status: StatusColor,
    pub is_new: bool,
    /// Current hover target of a connection being drawn.
    pub hovered: bool,
}

pub struct EditorSession<T> {
    store: GraphStore,
    canvas: CanvasState<NodeId>,
    transport: T,
    editor: Option<EditSurface>,
    archive_mutations: bool,
}

impl<T: SyncTransport> EditorSession<T> {
    pub fn new(store: GraphStore, screen: ScreenRect, config: CanvasConfig, transport: T) -> Self {
        Self {
            store,
            canvas: CanvasState::new(screen, config),
            transport,
            editor: None,
            archive_mutations: false,
        }
    }

    /// Also archive the snapshot published after adding or removing a node,
    /// removing a connection, or saving a node edit.
    pub fn with_archive(mut self, enabled: bool) -> Self {
        self.archive_mutations = enabled;
        self
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn canvas(&self) -> &CanvasState<NodeId> {
        &self.canvas
    }

    pub fn viewport(&self) -> &Viewport {
        self.canvas.viewport()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn editor(&self) -> Option<&EditSurface> {
        self.editor.as_ref()
    }

    pub fn edit_draft(&mut self) -> Option<&mut NodeEdit> {
        self.editor.as_mut().map(|editor| &mut editor.draft)
    }

    // Pointer input. The edit form is modal: the canvas ignores presses and
    // zoom while it is open.

    pub fn pointer_down(
        &mut self,
        point: ScreenPoint,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> bool {
        if self.editor.is_some() {
            return false;
        }
        self.canvas.pointer_down(&self.store, point, button, modifiers)
    }

    pub fn pointer_move(&mut self, point: ScreenPoint) {
        if let Some(GestureEffect::MoveNode { node, position }) =
            self.canvas.pointer_move(&self.store, point)
        {
            self.store
                .apply_intent(GraphIntent::SetNodePosition { id: node, position });
        }
    }

    pub fn pointer_up(&mut self) {
        self.release(ReleaseCause::PointerUp);
    }

    pub fn pointer_leave(&mut self) {
        self.release(ReleaseCause::PointerLeave);
    }

    pub fn cancel(&mut self) {
        self.release(ReleaseCause::Cancel);
    }

    fn release(&mut self, cause: ReleaseCause) {
        match self.canvas.release(cause) {
            Some(GestureEffect::DragReleased { node, moved, cause }) => {
                if !self.store.contains_node(node) {
                    log::debug!("dragged node {node} no longer exists");
                    return;
                }
                self.publish();
                if !moved && cause == ReleaseCause::PointerUp {
                    self.open_editor(node);
                }
            },
            Some(GestureEffect::ConnectionRequested { source, target }) => {
                self.connect(source, target);
            },
            Some(GestureEffect::MoveNode { .. }) | None => {},
        }
    }

    pub fn wheel(&mut self, point: ScreenPoint, delta_y: f64) -> bool {
        self.editor.is_none() && self.canvas.wheel(point, delta_y)
    }

    pub fn zoom_at(&mut self, point: ScreenPoint, factor: f64) -> bool {
        self.editor.is_none() && self.canvas.zoom_at(point, factor)
    }

    /// Track a resize of the hosting surface.
    pub fn resize(&mut self, size: ScreenSize) {
        let screen = ScreenRect::new(self.canvas.screen().origin, size);
        self.canvas.set_screen_rect(screen);
        if let Some(node) = self.editor.as_ref().map(|editor| editor.node) {
            self.place_editor(node);
        }
    }

    /// Start drawing a connection from `source`'s handle.
    pub fn begin_connection(&mut self, source: NodeId) -> bool {
        self.editor.is_none() && self.canvas.begin_connection(&self.store, source)
    }

    // Node controls.

    pub fn add_node_from(&mut self, source: NodeId) -> Option<NodeId> {
        match self.store.add_node_from(source) {
            Ok(id) => {
                log::debug!("added node {id} from {source}");
                self.publish_archived();
                self.place_editor(id);
                Some(id)
            },
            Err(reason) => {
                log::debug!("cannot add node from {source}: {reason}");
                None
            },
        }
    }

    pub fn remove_node(&mut self, id: NodeId) -> MutationOutcome {
        let outcome = self.store.apply_intent(GraphIntent::RemoveNode { id });
        if outcome.is_changed() {
            if self.editor.as_ref().is_some_and(|editor| editor.node == id) {
                self.editor = None;
            }
            self.publish_archived();
        }
        outcome
    }

    pub fn connect(&mut self, source: NodeId, target: NodeId) -> MutationOutcome {
        let outcome = self.store.apply_intent(GraphIntent::Connect { source, target });
        match outcome {
            MutationOutcome::Changed => self.publish(),
            MutationOutcome::Rejected(_) => emit_sent(CHANNEL_GRAPH_CONNECTION_REJECTED, 0),
            MutationOutcome::Unchanged => {},
        }
        outcome
    }

    pub fn remove_connection(&mut self, source: NodeId, target: NodeId) -> MutationOutcome {
        let outcome = self.store.apply_intent(GraphIntent::Disconnect { source, target });
        if outcome.is_changed() {
            self.publish_archived();
        }
        outcome
    }

    // Edit surface.

    pub fn open_editor(&mut self, id: NodeId) -> bool {
        self.place_editor(id)
    }

    fn place_editor(&mut self, id: NodeId) -> bool {
        let Some(node) = self.store.node(id) else {
            self.editor = None;
            return false;
        };
        let center = self.canvas.graph_to_screen(node.position());
        let (anchor, size) = edit_form_placement(center, self.canvas.screen());
        let draft = match self.editor.take() {
            Some(editor) if editor.node == id => editor.draft,
            _ => NodeEdit::from(node),
        };
        self.editor = Some(EditSurface {
            node: id,
            anchor,
            size,
            draft,
        });
        true
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Save the current draft of the open edit form.
    pub fn save_draft(&mut self) -> MutationOutcome {
        match self.editor.as_ref().map(|editor| editor.draft.clone()) {
            Some(draft) => self.save_node_edit(draft),
            None => MutationOutcome::Unchanged,
        }
    }

    /// Replace the open node's editable fields, close the form and publish.
    pub fn save_node_edit(&mut self, edit: NodeEdit) -> MutationOutcome {
        let Some(editor) = self.editor.take() else {
            return MutationOutcome::Unchanged;
        };
        let outcome = self.store.apply_intent(GraphIntent::UpdateNode {
            id: editor.node,
            edit,
        });
        if outcome.is_changed() {
            self.publish_archived();
        }
        outcome
    }

    // Synchronization.

    /// Apply one inbound text frame. Malformed frames and empty snapshots
    /// leave the store untouched.
    pub fn apply_inbound(&mut self, text: &str) -> InboundOutcome {
        let message = match SyncMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("discarding inbound sync message: {e}");
                emit_received(CHANNEL_SYNC_INBOUND_MALFORMED, text.len());
                return InboundOutcome::Malformed;
            },
        };
        match self.store.replace_from_remote(message.into_snapshot()) {
            ReplaceOutcome::Applied => {
                emit_received(CHANNEL_SYNC_INBOUND_APPLIED, text.len());
                if let Some(node) = self.editor.as_ref().map(|editor| editor.node)
                    && !self.store.contains_node(node)
                {
                    log::info!("closing editor: node {node} was removed remotely");
                    self.editor = None;
                }
                InboundOutcome::Applied
            },
            ReplaceOutcome::IgnoredEmpty => {
                emit_received(CHANNEL_SYNC_INBOUND_IGNORED_EMPTY, text.len());
                InboundOutcome::IgnoredEmpty
            },
        }
    }

    fn publish_archived(&mut self) {
        if self.archive_mutations {
            self.transport.archive(&self.store.snapshot());
        }
        self.publish();
    }

    /// Push the full current state outward.
    pub fn publish(&mut self) {
        let snapshot = self.store.snapshot();
        if !self.transport.is_open() {
            log::debug!(
                "sync channel closed; dropping update at revision {}",
                self.store.revision()
            );
            emit_sent(CHANNEL_SYNC_OUTBOUND_DROPPED, 0);
            return;
        }
        let frame = match SyncMessage::graph_update(snapshot).encode() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("{e}");
                emit_sent(CHANNEL_SYNC_OUTBOUND_DROPPED, 0);
                return;
            },
        };
        let byte_len = frame.len();
        if self.transport.publish(frame) {
            emit_sent(CHANNEL_SYNC_OUTBOUND_PUBLISHED, byte_len);
        } else {
            log::debug!("sync channel refused update");
            emit_sent(CHANNEL_SYNC_OUTBOUND_DROPPED, byte_len);
        }
    }

    // File transfer.

    /// Replace the graph with an imported file and publish it. A rejected
    /// file leaves the current graph as it was.
    pub fn import_bytes(&mut self, bytes: &[u8]) -> Result<(), ImportError> {
        let snapshot = match parse_import(bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("import rejected: {e}");
                emit_sent(CHANNEL_GRAPH_IMPORT_REJECTED, bytes.len());
                return Err(e);
            },
        };
        self.canvas.cancel();
        self.editor = None;
        self.store.replace_local(snapshot);
        self.publish();
        Ok(())
    }

    pub fn export_json(&self) -> Result<String, ImportError> {
        export_snapshot(&self.store.snapshot())
    }

    // Render packets.

    pub fn node_views(&self) -> Vec<NodeView> {
        let hover = self.canvas.pending_connection().and_then(|(_, _, hover)| hover);
        self.store
            .nodes()
            .iter()
            .map(|node| NodeView {
                id: node.id,
                center: self.canvas.graph_to_screen(node.position()),
                status: node.status(),
                is_new: node.is_new,
                hovered: hover == Some(node.id),
            })
            .collect()
    }

    /// Curves for every connection whose endpoints both exist, in graph space.
    pub fn connection_paths(&self) -> Vec<RenderedConnection> {
        self.store
            .connection_paths(self.canvas.config().node_metrics.half_width())
    }

    /// Curve from the source handle to the floating end of the connection being drawn.
    pub fn pending_connection_path(&self) -> Option<ConnectionPath> {
        let (source, free_end, _) = self.canvas.pending_connection()?;
        let origin = self.store.node(source)?.position();
        let half_width = self.canvas.config().node_metrics.half_width();
        Some(connection_path(
            origin,
            free_end + GraphVector::new(half_width, 0.0),
            half_width,
        ))
    }
}

/// Top-left corner and size of the edit form for a node drawn at `center`,
/// kept `EDIT_FORM_MARGIN` pixels inside the screen where it fits.
pub fn edit_form_placement(center: ScreenPoint, screen: &ScreenRect) -> (ScreenPoint, ScreenSize) {
    let height = (screen.size.height * EDIT_FORM_HEIGHT_RATIO).min(EDIT_FORM_MAX_HEIGHT);
    let size = ScreenSize::new(EDIT_FORM_WIDTH, height);
    let clamp_axis = |value: f64, start: f64, span: f64, extent: f64| {
        let low = start + EDIT_FORM_MARGIN;
        let high = start + span - extent - EDIT_FORM_MARGIN;
        if high < low { low } else { value.clamp(low, high) }
    };
    let anchor = ScreenPoint::new(
        clamp_axis(center.x, screen.origin.x, screen.size.width, size.width),
        clamp_axis(center.y, screen.origin.y, screen.size.height, size.height),
    );
    (anchor, size)
}
