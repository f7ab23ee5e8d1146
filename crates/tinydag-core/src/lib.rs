/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Graph state kernel for the tinydag editor: node records, the canonical
//! store, the `graph_update` wire codec and file import/export.

pub mod model;
pub mod store;
pub mod transfer;
pub mod wire;

pub use model::{Connection, GraphSnapshot, Node, NodeEdit, NodeId};
pub use store::{
    GraphIntent, GraphStore, MutationOutcome, RejectReason, RenderedConnection, ReplaceOutcome,
};
pub use transfer::{ImportError, export_snapshot, parse_import};
pub use wire::{SyncMessage, WireError};
