/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Node and connection records as they travel on the wire.

use serde::{Deserialize, Serialize};
use tinydag_canvas::{GraphPoint, StatusColor, status_color};

/// Node identity. Assigned as `max(existing) + 1`, never recycled while the
/// graph holds nodes.
pub type NodeId = i64;

/// A processing step in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub name: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default, rename = "inputTypes")]
    pub input_types: Vec<String>,
    #[serde(default, rename = "outputTypes")]
    pub output_types: Vec<String>,
    /// Score in `[0, 1]`; absent or zero means not yet evaluated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
    /// Created locally and not yet saved through the edit surface. Never synchronized.
    #[serde(skip)]
    pub is_new: bool,
}

impl Node {
    /// Blank node at `(x, y)` named after its id.
    pub fn blank(id: NodeId, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            name: format!("Node {id}"),
            target: String::new(),
            code: String::new(),
            reasoning: String::new(),
            input: Vec::new(),
            output: Vec::new(),
            input_types: Vec::new(),
            output_types: Vec::new(),
            fitness: Some(0.0),
            is_new: false,
        }
    }

    pub fn position(&self) -> GraphPoint {
        GraphPoint::new(self.x, self.y)
    }

    pub fn set_position(&mut self, position: GraphPoint) {
        self.x = position.x;
        self.y = position.y;
    }

    pub fn status(&self) -> StatusColor {
        status_color(self.fitness)
    }

    /// Overwrite every edit-surface field, leaving identity and position alone.
    pub fn apply_edit(&mut self, edit: NodeEdit) {
        self.name = edit.name;
        self.target = edit.target;
        self.code = edit.code;
        self.reasoning = edit.reasoning;
        self.input = edit.input;
        self.output = edit.output;
        self.input_types = edit.input_types;
        self.output_types = edit.output_types;
        self.fitness = edit.fitness;
        self.is_new = false;
    }
}

/// Fields owned by the node edit surface.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeEdit {
    pub name: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub output: Vec<String>,
    #[serde(default, rename = "inputTypes")]
    pub input_types: Vec<String>,
    #[serde(default, rename = "outputTypes")]
    pub output_types: Vec<String>,
    #[serde(default)]
    pub fitness: Option<f64>,
}

impl From<&Node> for NodeEdit {
    fn from(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            target: node.target.clone(),
            code: node.code.clone(),
            reasoning: node.reasoning.clone(),
            input: node.input.clone(),
            output: node.output.clone(),
            input_types: node.input_types.clone(),
            output_types: node.output_types.clone(),
            fitness: node.fitness,
        }
    }
}

/// Directed link keyed by its `(source, target)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
}

impl Connection {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }
}

/// Full `{nodes, connections}` payload used by snapshot fetch, import and export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

impl GraphSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Graph used when the remote holds no prior state.
    pub fn builtin_default() -> Self {
        let input = Node {
            name: "Input Node".to_string(),
            target: "input".to_string(),
            output: vec!["data".to_string()],
            code: "data = 42".to_string(),
            fitness: Some(0.8),
            reasoning: "Initial data input".to_string(),
            output_types: vec!["int".to_string()],
            ..Node::blank(1, 300.0, 300.0)
        };
        let process = Node {
            name: "Processing Node".to_string(),
            target: "process".to_string(),
            input: vec!["data".to_string()],
            output: vec!["result".to_string()],
            code: "result = data * 2".to_string(),
            fitness: Some(0.7),
            reasoning: "Double the input value".to_string(),
            input_types: vec!["int".to_string()],
            output_types: vec!["int".to_string()],
            ..Node::blank(2, 550.0, 300.0)
        };
        Self {
            nodes: vec![input, process],
            connections: vec![Connection::new(1, 2)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_uses_camel_case_type_lists_on_the_wire() {
        let mut node = Node::blank(3, 1.5, -2.0);
        node.input_types = vec!["int".into()];
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["inputTypes"], serde_json::json!(["int"]));
        assert_eq!(value["outputTypes"], serde_json::json!([]));
        assert!(value.get("is_new").is_none());
        assert!(value.get("isNewNode").is_none());
    }

    #[test]
    fn node_optional_fields_default_when_missing() {
        let node: Node =
            serde_json::from_str(r#"{"id": 4, "x": 10, "y": 20, "name": "Bare"}"#).unwrap();
        assert_eq!(node.position(), GraphPoint::new(10.0, 20.0));
        assert!(node.input.is_empty());
        assert_eq!(node.fitness, None);
        assert_eq!(node.status(), StatusColor::Neutral);
    }

    #[test]
    fn node_without_position_is_rejected() {
        assert!(serde_json::from_str::<Node>(r#"{"id": 4, "name": "Nowhere"}"#).is_err());
    }

    #[test]
    fn apply_edit_keeps_position_and_clears_new_flag() {
        let mut node = Node::blank(9, 5.0, 6.0);
        node.is_new = true;
        node.apply_edit(NodeEdit {
            name: "Renamed".into(),
            fitness: Some(0.9),
            ..NodeEdit::default()
        });
        assert_eq!(node.name, "Renamed");
        assert_eq!(node.position(), GraphPoint::new(5.0, 6.0));
        assert!(!node.is_new);
        assert_eq!(node.status(), StatusColor::Success);
    }

    #[test]
    fn builtin_default_graph_is_connected_pair() {
        let snapshot = GraphSnapshot::builtin_default();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].name, "Input Node");
        assert_eq!(snapshot.nodes[1].code, "result = data * 2");
        assert_eq!(snapshot.connections, vec![Connection::new(1, 2)]);
    }
}
