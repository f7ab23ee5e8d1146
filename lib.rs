/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! tinydag: interaction and synchronization engine for a collaborative
//! node-link DAG editor.
//!
//! The canvas kernel lives in `tinydag-canvas`, the graph model and wire codec
//! in `tinydag-core`. This crate wires them into an [`session::EditorSession`]
//! and connects that session to the server through [`sync`].

pub mod diagnostics;
pub mod prefs;
pub mod runtime;
pub mod session;
pub mod sync;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
