/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Snapshot import and export as plain `{nodes, connections}` JSON.

use serde_json::Value;

use crate::model::GraphSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    Malformed(String),
    MissingKey(&'static str),
    Encode(String),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "invalid graph file: {e}"),
            Self::MissingKey(key) => write!(f, "invalid graph file: missing \"{key}\""),
            Self::Encode(e) => write!(f, "failed to encode graph: {e}"),
        }
    }
}

impl std::error::Error for ImportError {}

/// Parse an imported graph file. Both top-level collections must be present;
/// an empty node list is allowed.
pub fn parse_import(bytes: &[u8]) -> Result<GraphSnapshot, ImportError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ImportError::Malformed(e.to_string()))?;
    for key in ["nodes", "connections"] {
        if value.get(key).is_none() {
            return Err(ImportError::MissingKey(key));
        }
    }
    serde_json::from_value(value).map_err(|e| ImportError::Malformed(e.to_string()))
}

/// Pretty-printed JSON suitable for [`parse_import`].
pub fn export_snapshot(snapshot: &GraphSnapshot) -> Result<String, ImportError> {
    serde_json::to_string_pretty(snapshot).map_err(|e| ImportError::Encode(e.to_string()))
}
