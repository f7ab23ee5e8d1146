/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Serializable editor input, one JSON object per line.
//!
//! ```text
//! {"kind": "pointer_down", "x": 300, "y": 300}
//! {"kind": "pointer_move", "x": 420, "y": 310}
//! {"kind": "pointer_up"}
//! {"kind": "add_node", "source": 1}
//! ```

use serde::{Deserialize, Serialize};
use tinydag_canvas::{Modifiers, PointerButton, ScreenPoint, ScreenSize};
use tinydag_core::{NodeEdit, NodeId};

use super::{EditorSession, SyncTransport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditorInput {
    PointerDown {
        x: f64,
        y: f64,
        #[serde(default = "primary_button")]
        button: PointerButton,
        #[serde(default)]
        modifiers: Modifiers,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp,
    PointerLeave,
    Cancel,
    Wheel {
        x: f64,
        y: f64,
        delta_y: f64,
    },
    Resize {
        width: f64,
        height: f64,
    },
    BeginConnection {
        source: NodeId,
    },
    AddNode {
        source: NodeId,
    },
    RemoveNode {
        id: NodeId,
    },
    RemoveConnection {
        source: NodeId,
        target: NodeId,
    },
    OpenEditor {
        id: NodeId,
    },
    SaveEdit {
        edit: NodeEdit,
    },
    CloseEditor,
}

fn primary_button() -> PointerButton {
    PointerButton::Primary
}

impl<T: SyncTransport> EditorSession<T> {
    pub fn dispatch(&mut self, input: EditorInput) {
        log::trace!("dispatch {input:?}");
        match input {
            EditorInput::PointerDown {
                x,
                y,
                button,
                modifiers,
            } => {
                self.pointer_down(ScreenPoint::new(x, y), button, modifiers);
            },
            EditorInput::PointerMove { x, y } => self.pointer_move(ScreenPoint::new(x, y)),
            EditorInput::PointerUp => self.pointer_up(),
            EditorInput::PointerLeave => self.pointer_leave(),
            EditorInput::Cancel => self.cancel(),
            EditorInput::Wheel { x, y, delta_y } => {
                self.wheel(ScreenPoint::new(x, y), delta_y);
            },
            EditorInput::Resize { width, height } => self.resize(ScreenSize::new(width, height)),
            EditorInput::BeginConnection { source } => {
                self.begin_connection(source);
            },
            EditorInput::AddNode { source } => {
                self.add_node_from(source);
            },
            EditorInput::RemoveNode { id } => {
                self.remove_node(id);
            },
            EditorInput::RemoveConnection { source, target } => {
                self.remove_connection(source, target);
            },
            EditorInput::OpenEditor { id } => {
                self.open_editor(id);
            },
            EditorInput::SaveEdit { edit } => {
                self.save_node_edit(edit);
            },
            EditorInput::CloseEditor => self.close_editor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "input script line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ScriptError {}

/// Parse a JSON-lines input script. Blank lines and `#` comments are skipped.
pub fn parse_script(text: &str) -> Result<Vec<EditorInput>, ScriptError> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, body)| {
            serde_json::from_str(body).map_err(|e| ScriptError {
                line,
                message: e.to_string(),
            })
        })
        .collect()
}
