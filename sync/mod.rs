/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Network side of synchronization: the socket worker, its session-facing
//! handle and the HTTP API.

pub mod remote;
pub mod sync_worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tinydag_core::GraphSnapshot;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::diagnostics::{CHANNEL_SYNC_ARCHIVE_FAILED, emit_sent};
use crate::prefs::ReconnectPreferences;
use crate::session::SyncTransport;

pub use remote::{RemoteError, RemoteGraphApi, archive_filename};
pub use sync_worker::{OutboundCommand, SyncEvent, SyncWorker};

/// Session-side handle to a running [`SyncWorker`].
pub struct SyncChannel {
    open: Arc<AtomicBool>,
    command_tx: mpsc::UnboundedSender<OutboundCommand>,
    archive: Option<ArchiveSink>,
}

/// Spawned pieces of a sync channel.
pub struct SyncChannelParts {
    pub channel: SyncChannel,
    pub events: mpsc::UnboundedReceiver<SyncEvent>,
    pub worker: JoinHandle<()>,
}

impl SyncChannel {
    /// Spawn the worker on the current runtime.
    pub fn spawn(
        url: Url,
        reconnect: ReconnectPreferences,
        cancel: CancellationToken,
    ) -> SyncChannelParts {
        let open = Arc::new(AtomicBool::new(false));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let worker = SyncWorker::new(url, reconnect, open.clone(), command_rx, event_tx, cancel);
        let worker = tokio::spawn(worker.run());
        SyncChannelParts {
            channel: SyncChannel {
                open,
                command_tx,
                archive: None,
            },
            events,
            worker,
        }
    }

    /// Archive snapshots handed to [`SyncTransport::archive`] through `api` on
    /// the current runtime.
    pub fn with_archive(mut self, api: RemoteGraphApi) -> Self {
        self.archive = Some(ArchiveSink {
            api,
            runtime: Handle::current(),
        });
        self
    }

    /// Wait until every frame queued so far has been written or discarded.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.command_tx.send(OutboundCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

impl SyncTransport for SyncChannel {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn publish(&mut self, frame: String) -> bool {
        self.command_tx.send(OutboundCommand::Publish(frame)).is_ok()
    }

    fn archive(&mut self, snapshot: &GraphSnapshot) {
        if let Some(sink) = &self.archive {
            sink.submit(snapshot.clone());
        }
    }
}

struct ArchiveSink {
    api: RemoteGraphApi,
    runtime: Handle,
}

impl ArchiveSink {
    /// Fire and forget; failures are logged and never retried.
    fn submit(&self, snapshot: GraphSnapshot) {
        let api = self.api.clone();
        self.runtime.spawn(async move {
            if let Err(e) = api.save_temp_file(&snapshot).await {
                log::warn!("failed to archive graph: {e}");
                emit_sent(CHANNEL_SYNC_ARCHIVE_FAILED, 0);
            }
        });
    }
}
