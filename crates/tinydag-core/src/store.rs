/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Canonical node and connection collections.
//!
//! Local edits go through [`GraphStore::apply_intent`] and are applied
//! optimistically. Remote state arrives as whole snapshots through
//! [`GraphStore::replace_from_remote`]; the later snapshot wins, except that a
//! snapshot with no nodes is ignored.

use std::collections::HashSet;

use tinydag_canvas::{CanvasNodes, ConnectionPath, GraphPoint, GraphVector, connection_path};

use crate::model::{Connection, GraphSnapshot, Node, NodeEdit, NodeId};

/// Horizontal offset of a node added from a source node.
pub const ADD_NODE_OFFSET: GraphVector = GraphVector::new(300.0, 0.0);

/// Local graph mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphIntent {
    SetNodePosition { id: NodeId, position: GraphPoint },
    AddNodeFrom { source: NodeId },
    RemoveNode { id: NodeId },
    Connect { source: NodeId, target: NodeId },
    Disconnect { source: NodeId, target: NodeId },
    UpdateNode { id: NodeId, edit: NodeEdit },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    SelfLoop,
    Duplicate,
    MissingEndpoint,
    MissingNode,
    IdSpaceExhausted,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfLoop => write!(f, "source and target are the same node"),
            Self::Duplicate => write!(f, "connection already exists"),
            Self::MissingEndpoint => write!(f, "connection endpoint does not exist"),
            Self::MissingNode => write!(f, "node does not exist"),
            Self::IdSpaceExhausted => write!(f, "no node ids left above the highest id seen"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Changed,
    Unchanged,
    Rejected(RejectReason),
}

impl MutationOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, MutationOutcome::Changed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Applied,
    IgnoredEmpty,
}

/// A connection whose endpoints both exist, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedConnection {
    pub connection: Connection,
    pub path: ConnectionPath,
}

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    /// Highest id this store has seen. Keeps deleted ids from being handed out again.
    high_water: NodeId,
    revision: u64,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded from a snapshot. Unlike remote replacement, an empty
    /// snapshot is accepted here.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut store = Self::new();
        store.install(snapshot);
        store
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn has_connection(&self, source: NodeId, target: NodeId) -> bool {
        self.connections.contains(&Connection::new(source, target))
    }

    /// Bumped on every local change and every applied remote snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Id the next created node will receive, or `None` once the highest id
    /// seen is `NodeId::MAX`.
    pub fn next_node_id(&self) -> Option<NodeId> {
        let max_existing = self.nodes.iter().map(|node| node.id).max().unwrap_or(0);
        self.high_water.max(max_existing).max(0).checked_add(1)
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
        }
    }

    pub fn apply_intents(
        &mut self,
        intents: impl IntoIterator<Item = GraphIntent>,
    ) -> MutationOutcome {
        let mut changed = false;
        let mut last = MutationOutcome::Unchanged;
        for intent in intents {
            last = self.apply_intent(intent);
            changed |= last.is_changed();
        }
        if changed { MutationOutcome::Changed } else { last }
    }

    pub fn apply_intent(&mut self, intent: GraphIntent) -> MutationOutcome {
        let outcome = match intent {
            GraphIntent::SetNodePosition { id, position } => self.set_node_position(id, position),
            GraphIntent::AddNodeFrom { source } => match self.insert_node_from(source) {
                Ok(_) => MutationOutcome::Changed,
                Err(reason) => MutationOutcome::Rejected(reason),
            },
            GraphIntent::RemoveNode { id } => self.remove_node(id),
            GraphIntent::Connect { source, target } => self.connect(source, target),
            GraphIntent::Disconnect { source, target } => self.disconnect(source, target),
            GraphIntent::UpdateNode { id, edit } => match self.node_mut(id) {
                Some(node) => {
                    node.apply_edit(edit);
                    MutationOutcome::Changed
                },
                None => MutationOutcome::Rejected(RejectReason::MissingNode),
            },
        };
        if outcome.is_changed() {
            self.revision += 1;
        }
        outcome
    }

    /// Create a blank node to the right of `source` and connect it.
    pub fn add_node_from(&mut self, source: NodeId) -> Result<NodeId, RejectReason> {
        let id = self.insert_node_from(source)?;
        self.revision += 1;
        Ok(id)
    }

    fn insert_node_from(&mut self, source: NodeId) -> Result<NodeId, RejectReason> {
        let origin = self.node(source).ok_or(RejectReason::MissingNode)?.position();
        let id = self.next_node_id().ok_or(RejectReason::IdSpaceExhausted)?;
        let position = origin + ADD_NODE_OFFSET;
        let mut node = Node::blank(id, position.x, position.y);
        node.is_new = true;
        self.nodes.push(node);
        self.connections.push(Connection::new(source, id));
        self.high_water = id;
        Ok(id)
    }

    fn set_node_position(&mut self, id: NodeId, position: GraphPoint) -> MutationOutcome {
        match self.node_mut(id) {
            Some(node) if node.position() == position => MutationOutcome::Unchanged,
            Some(node) => {
                node.set_position(position);
                MutationOutcome::Changed
            },
            None => MutationOutcome::Rejected(RejectReason::MissingNode),
        }
    }

    fn remove_node(&mut self, id: NodeId) -> MutationOutcome {
        let before = self.nodes.len();
        self.nodes.retain(|node| node.id != id);
        if self.nodes.len() == before {
            return MutationOutcome::Rejected(RejectReason::MissingNode);
        }
        self.connections.retain(|connection| !connection.touches(id));
        MutationOutcome::Changed
    }

    fn connect(&mut self, source: NodeId, target: NodeId) -> MutationOutcome {
        let reason = if source == target {
            Some(RejectReason::SelfLoop)
        } else if !self.contains_node(source) || !self.contains_node(target) {
            Some(RejectReason::MissingEndpoint)
        } else if self.has_connection(source, target) {
            Some(RejectReason::Duplicate)
        } else {
            None
        };
        if let Some(reason) = reason {
            log::debug!("rejected connection {source} -> {target}: {reason}");
            return MutationOutcome::Rejected(reason);
        }
        self.connections.push(Connection::new(source, target));
        MutationOutcome::Changed
    }

    fn disconnect(&mut self, source: NodeId, target: NodeId) -> MutationOutcome {
        let before = self.connections.len();
        self.connections
            .retain(|connection| *connection != Connection::new(source, target));
        if self.connections.len() == before {
            MutationOutcome::Unchanged
        } else {
            MutationOutcome::Changed
        }
    }

    /// Replace both collections with a remote snapshot, unless it has no nodes.
    pub fn replace_from_remote(&mut self, snapshot: GraphSnapshot) -> ReplaceOutcome {
        if snapshot.is_empty() {
            log::debug!(
                "ignoring empty remote snapshot ({} connections)",
                snapshot.connections.len()
            );
            return ReplaceOutcome::IgnoredEmpty;
        }
        self.install(snapshot);
        ReplaceOutcome::Applied
    }

    /// Replace both collections with an imported snapshot.
    pub fn replace_local(&mut self, snapshot: GraphSnapshot) {
        self.install(snapshot);
    }

    fn install(&mut self, snapshot: GraphSnapshot) {
        let snapshot_max = snapshot.nodes.iter().map(|node| node.id).max().unwrap_or(0);
        self.high_water = self.high_water.max(snapshot_max);
        self.nodes = snapshot.nodes;
        self.connections = unique_pairs(snapshot.connections);
        self.revision += 1;
    }

    /// Connections whose endpoints both exist, in storage order.
    pub fn renderable_connections(&self) -> impl Iterator<Item = (Connection, &Node, &Node)> + '_ {
        self.connections.iter().filter_map(|connection| {
            let source = self.node(connection.source)?;
            let target = self.node(connection.target)?;
            Some((*connection, source, target))
        })
    }

    /// Cubic paths for every renderable connection.
    pub fn connection_paths(&self, half_width: f64) -> Vec<RenderedConnection> {
        self.renderable_connections()
            .map(|(connection, source, target)| RenderedConnection {
                connection,
                path: connection_path(source.position(), target.position(), half_width),
            })
            .collect()
    }
}

/// Drop repeated `(source, target)` pairs, keeping the first of each.
fn unique_pairs(connections: Vec<Connection>) -> Vec<Connection> {
    let mut seen = HashSet::with_capacity(connections.len());
    connections
        .into_iter()
        .filter(|connection| seen.insert(*connection))
        .collect()
}

impl CanvasNodes for GraphStore {
    type Id = NodeId;

    fn node_positions(&self) -> impl Iterator<Item = (NodeId, GraphPoint)> + '_ {
        self.nodes.iter().map(|node| (node.id, node.position()))
    }
}
