/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Synchronization channel message codec.
//!
//! Both directions carry the same JSON body:
//! `{"type": "graph_update", "nodes": [...], "connections": [...]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Connection, GraphSnapshot, Node};

pub const GRAPH_UPDATE: &str = "graph_update";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    GraphUpdate {
        nodes: Vec<Node>,
        connections: Vec<Connection>,
    },
}

impl SyncMessage {
    pub fn graph_update(snapshot: GraphSnapshot) -> Self {
        SyncMessage::GraphUpdate {
            nodes: snapshot.nodes,
            connections: snapshot.connections,
        }
    }

    pub fn into_snapshot(self) -> GraphSnapshot {
        match self {
            SyncMessage::GraphUpdate { nodes, connections } => GraphSnapshot { nodes, connections },
        }
    }

    pub fn encode(&self) -> Result<String, WireError> {
        serde_json::to_string(self).map_err(|e| WireError::Encode(e.to_string()))
    }

    /// Parse an inbound text frame. Anything other than a well-formed
    /// `graph_update` is an error the caller discards.
    pub fn decode(text: &str) -> Result<Self, WireError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| WireError::Malformed(e.to_string()))?;
        match value.get("type").and_then(Value::as_str) {
            Some(GRAPH_UPDATE) => {},
            Some(other) => return Err(WireError::UnsupportedType(other.to_string())),
            None => return Err(WireError::MissingType),
        }
        serde_json::from_value(value).map_err(|e| WireError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    Malformed(String),
    MissingType,
    UnsupportedType(String),
    Encode(String),
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed sync message: {e}"),
            Self::MissingType => write!(f, "sync message has no type tag"),
            Self::UnsupportedType(kind) => write!(f, "unsupported sync message type {kind:?}"),
            Self::Encode(e) => write!(f, "failed to encode sync message: {e}"),
        }
    }
}

impl std::error::Error for WireError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_type_tag_and_collections() {
        let message = SyncMessage::graph_update(GraphSnapshot::builtin_default());
        let value: Value = serde_json::from_str(&message.encode().unwrap()).unwrap();
        assert_eq!(value["type"], "graph_update");
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(value["connections"][0]["source"], 1);
        assert_eq!(value["connections"][0]["target"], 2);
    }

    #[test]
    fn decodes_graph_update() {
        let text = concat!(
            r#"{"type":"graph_update","nodes":[{"id":1,"x":0,"y":0,"name":"A"}],"#,
            r#""connections":[]}"#
        );
        let snapshot = SyncMessage::decode(text).unwrap().into_snapshot();
        assert_eq!(snapshot.nodes.len(), 1);
        assert!(snapshot.connections.is_empty());
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(SyncMessage::decode("not json"), Err(WireError::Malformed(_))));
    }

    #[test]
    fn rejects_missing_collections() {
        let text = r#"{"type":"graph_update","nodes":[]}"#;
        assert!(matches!(SyncMessage::decode(text), Err(WireError::Malformed(_))));
    }

    #[test]
    fn rejects_other_message_types() {
        let text = r#"{"type":"chat_message","message":"hi"}"#;
        assert_eq!(
            SyncMessage::decode(text),
            Err(WireError::UnsupportedType("chat_message".to_string()))
        );
        assert_eq!(SyncMessage::decode(r#"{"nodes":[]}"#), Err(WireError::MissingType));
    }
}
