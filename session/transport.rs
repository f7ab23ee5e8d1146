/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Outbound side of the synchronization channel, as seen by the session.

use tinydag_core::{GraphSnapshot, SyncMessage};

/// Fire-and-forget sink for encoded `graph_update` frames.
///
/// Sends never wait for acknowledgment. A closed channel drops the frame.
pub trait SyncTransport {
    fn is_open(&self) -> bool;

    /// Queue one frame. Returns `false` if the frame was dropped.
    fn publish(&mut self, frame: String) -> bool;

    /// Hand a snapshot to the mutation archive, if this transport has one.
    fn archive(&mut self, _snapshot: &GraphSnapshot) {}
}

/// Transport that is never open.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineTransport;

impl SyncTransport for OfflineTransport {
    fn is_open(&self) -> bool {
        false
    }

    fn publish(&mut self, _frame: String) -> bool {
        false
    }
}

/// In-memory transport that keeps every frame it accepts.
#[derive(Debug, Clone)]
pub struct RecordingTransport {
    open: bool,
    frames: Vec<String>,
    archived: Vec<GraphSnapshot>,
}

impl RecordingTransport {
    pub fn open() -> Self {
        Self {
            open: true,
            frames: Vec::new(),
            archived: Vec::new(),
        }
    }

    pub fn closed() -> Self {
        Self {
            open: false,
            ..Self::open()
        }
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn archived(&self) -> &[GraphSnapshot] {
        &self.archived
    }

    /// Decoded snapshots for every accepted frame, oldest first.
    pub fn published(&self) -> Vec<GraphSnapshot> {
        self.frames
            .iter()
            .filter_map(|frame| SyncMessage::decode(frame).ok())
            .map(SyncMessage::into_snapshot)
            .collect()
    }

    pub fn last_published(&self) -> Option<GraphSnapshot> {
        self.published().pop()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
        self.archived.clear();
    }
}

impl SyncTransport for RecordingTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    fn publish(&mut self, frame: String) -> bool {
        if !self.open {
            return false;
        }
        self.frames.push(frame);
        true
    }

    fn archive(&mut self, snapshot: &GraphSnapshot) {
        self.archived.push(snapshot.clone());
    }
}
