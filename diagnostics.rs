/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::OnceLock;

use crossbeam_channel::{Receiver, Sender, unbounded};

pub const CHANNEL_SYNC_OUTBOUND_PUBLISHED: &str = "sync.outbound.published";
pub const CHANNEL_SYNC_OUTBOUND_DROPPED: &str = "sync.outbound.dropped";
pub const CHANNEL_SYNC_INBOUND_APPLIED: &str = "sync.inbound.applied";
pub const CHANNEL_SYNC_INBOUND_IGNORED_EMPTY: &str = "sync.inbound.ignored_empty";
pub const CHANNEL_SYNC_INBOUND_MALFORMED: &str = "sync.inbound.malformed";
pub const CHANNEL_GRAPH_CONNECTION_REJECTED: &str = "graph.connection.rejected";
pub const CHANNEL_GRAPH_IMPORT_REJECTED: &str = "graph.import.rejected";
pub const CHANNEL_SYNC_ARCHIVE_FAILED: &str = "sync.archive.failed";

pub const ALL_CHANNELS: [&str; 8] = [
    CHANNEL_SYNC_OUTBOUND_PUBLISHED,
    CHANNEL_SYNC_OUTBOUND_DROPPED,
    CHANNEL_SYNC_INBOUND_APPLIED,
    CHANNEL_SYNC_INBOUND_IGNORED_EMPTY,
    CHANNEL_SYNC_INBOUND_MALFORMED,
    CHANNEL_GRAPH_CONNECTION_REJECTED,
    CHANNEL_GRAPH_IMPORT_REJECTED,
    CHANNEL_SYNC_ARCHIVE_FAILED,
];

static GLOBAL_DIAGNOSTICS_TX: OnceLock<Sender<DiagnosticEvent>> = OnceLock::new();

thread_local! {
    static THREAD_DIAGNOSTICS_TX: RefCell<Option<Sender<DiagnosticEvent>>> =
        const { RefCell::new(None) };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    MessageSent {
        channel_id: &'static str,
        byte_len: usize,
    },
    MessageReceived {
        channel_id: &'static str,
        byte_len: usize,
    },
}

impl DiagnosticEvent {
    pub fn channel_id(&self) -> &'static str {
        match self {
            DiagnosticEvent::MessageSent { channel_id, .. }
            | DiagnosticEvent::MessageReceived { channel_id, .. } => channel_id,
        }
    }

    fn byte_len(&self) -> usize {
        match self {
            DiagnosticEvent::MessageSent { byte_len, .. }
            | DiagnosticEvent::MessageReceived { byte_len, .. } => *byte_len,
        }
    }
}

/// Install the process-wide sink. Only the first call takes effect.
pub fn install_global_sender(sender: Sender<DiagnosticEvent>) {
    let _ = GLOBAL_DIAGNOSTICS_TX.set(sender);
}

/// Route events emitted on this thread to `sender` until the guard drops.
pub fn install_thread_sender(sender: Sender<DiagnosticEvent>) -> ThreadSenderGuard {
    let previous = THREAD_DIAGNOSTICS_TX.with(|slot| slot.borrow_mut().replace(sender));
    ThreadSenderGuard { previous }
}

pub struct ThreadSenderGuard {
    previous: Option<Sender<DiagnosticEvent>>,
}

impl Drop for ThreadSenderGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        THREAD_DIAGNOSTICS_TX.with(|slot| *slot.borrow_mut() = previous);
    }
}

pub fn emit_event(event: DiagnosticEvent) {
    let unrouted = THREAD_DIAGNOSTICS_TX.with(|slot| match slot.borrow().as_ref() {
        Some(tx) => {
            let _ = tx.send(event);
            None
        },
        None => Some(event),
    });
    if let (Some(event), Some(tx)) = (unrouted, GLOBAL_DIAGNOSTICS_TX.get()) {
        let _ = tx.send(event);
    }
}

pub fn emit_sent(channel_id: &'static str, byte_len: usize) {
    emit_event(DiagnosticEvent::MessageSent {
        channel_id,
        byte_len,
    });
}

pub fn emit_received(channel_id: &'static str, byte_len: usize) {
    emit_event(DiagnosticEvent::MessageReceived {
        channel_id,
        byte_len,
    });
}

/// Per-channel counters fed from the diagnostics sink.
pub struct DiagnosticsState {
    event_rx: Receiver<DiagnosticEvent>,
    message_counts: HashMap<&'static str, u64>,
    message_bytes: HashMap<&'static str, u64>,
    _thread_guard: Option<ThreadSenderGuard>,
}

impl DiagnosticsState {
    /// State fed by the process-wide sink.
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        install_global_sender(event_tx);
        Self::with_receiver(event_rx, None)
    }

    /// State fed only by events emitted on the current thread.
    pub fn capture_current_thread() -> Self {
        let (event_tx, event_rx) = unbounded();
        let guard = install_thread_sender(event_tx);
        Self::with_receiver(event_rx, Some(guard))
    }

    fn with_receiver(
        event_rx: Receiver<DiagnosticEvent>,
        guard: Option<ThreadSenderGuard>,
    ) -> Self {
        Self {
            event_rx,
            message_counts: HashMap::new(),
            message_bytes: HashMap::new(),
            _thread_guard: guard,
        }
    }

    pub fn drain(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            let channel = event.channel_id();
            *self.message_counts.entry(channel).or_insert(0) += 1;
            *self.message_bytes.entry(channel).or_insert(0) += event.byte_len() as u64;
        }
    }

    pub fn count(&mut self, channel: &'static str) -> u64 {
        self.drain();
        self.message_counts.get(channel).copied().unwrap_or(0)
    }

    pub fn bytes(&mut self, channel: &'static str) -> u64 {
        self.drain();
        self.message_bytes.get(channel).copied().unwrap_or(0)
    }

    /// `channel count bytes` lines for every channel that saw traffic.
    pub fn summary_lines(&mut self) -> Vec<String> {
        self.drain();
        let mut channels: Vec<(&'static str, u64, u64)> = self
            .message_counts
            .iter()
            .map(|(channel, count)| {
                let bytes = self.message_bytes.get(channel).copied().unwrap_or(0);
                (*channel, *count, bytes)
            })
            .collect();
        channels.sort_by_key(|(channel, ..)| *channel);
        channels
            .into_iter()
            .map(|(channel, count, bytes)| format!("{channel} count={count} bytes={bytes}"))
            .collect()
    }

    pub fn log_summary(&mut self) {
        let lines = self.summary_lines();
        if lines.is_empty() {
            log::info!("diagnostics: no channel traffic");
        }
        for line in lines {
            log::info!("diagnostics: {line}");
        }
    }
}

impl Default for DiagnosticsState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_capture_counts_by_channel() {
        let mut state = DiagnosticsState::capture_current_thread();
        emit_sent(CHANNEL_SYNC_OUTBOUND_PUBLISHED, 40);
        emit_sent(CHANNEL_SYNC_OUTBOUND_PUBLISHED, 2);
        emit_received(CHANNEL_SYNC_INBOUND_MALFORMED, 7);

        assert_eq!(state.count(CHANNEL_SYNC_OUTBOUND_PUBLISHED), 2);
        assert_eq!(state.bytes(CHANNEL_SYNC_OUTBOUND_PUBLISHED), 42);
        assert_eq!(state.count(CHANNEL_SYNC_INBOUND_MALFORMED), 1);
        assert_eq!(state.count(CHANNEL_SYNC_OUTBOUND_DROPPED), 0);
    }

    #[test]
    fn summary_is_sorted_by_channel() {
        let mut state = DiagnosticsState::capture_current_thread();
        emit_sent(CHANNEL_SYNC_OUTBOUND_PUBLISHED, 3);
        emit_sent(CHANNEL_GRAPH_CONNECTION_REJECTED, 0);
        assert_eq!(
            state.summary_lines(),
            vec![
                "graph.connection.rejected count=1 bytes=0".to_string(),
                "sync.outbound.published count=1 bytes=3".to_string(),
            ]
        );
    }

    #[test]
    fn dropping_capture_restores_previous_sink() {
        let mut outer = DiagnosticsState::capture_current_thread();
        {
            let mut inner = DiagnosticsState::capture_current_thread();
            emit_sent(CHANNEL_SYNC_ARCHIVE_FAILED, 1);
            assert_eq!(inner.count(CHANNEL_SYNC_ARCHIVE_FAILED), 1);
        }
        emit_sent(CHANNEL_SYNC_ARCHIVE_FAILED, 1);
        assert_eq!(outer.count(CHANNEL_SYNC_ARCHIVE_FAILED), 1);
    }
}
