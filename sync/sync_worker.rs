/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

// SyncWorker - owns the graph_update socket
//
// The worker is a tokio task that:
// - Connects to the server socket, reconnecting with exponential backoff
// - Writes queued outbound frames in order
// - Forwards inbound text frames to the session as SyncEvents
// - Discards anything still queued when the socket goes away

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::diagnostics::{CHANNEL_SYNC_OUTBOUND_DROPPED, emit_sent};
use crate::prefs::ReconnectPreferences;

/// Commands sent to the SyncWorker
#[derive(Debug)]
pub enum OutboundCommand {
    /// Write one encoded frame
    Publish(String),
    /// Answer once every frame queued before this one has been written
    Flush(oneshot::Sender<()>),
}

/// Connection state changes and inbound frames, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    Inbound(String),
    /// Reconnect attempts exhausted; the worker has stopped
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PumpExit {
    Lost,
    Shutdown,
}

pub struct SyncWorker {
    url: Url,
    reconnect: ReconnectPreferences,
    /// Shared with the session-side handle; true only while the socket is up
    open: Arc<AtomicBool>,
    command_rx: mpsc::UnboundedReceiver<OutboundCommand>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
    cancel: CancellationToken,
}

impl SyncWorker {
    pub fn new(
        url: Url,
        reconnect: ReconnectPreferences,
        open: Arc<AtomicBool>,
        command_rx: mpsc::UnboundedReceiver<OutboundCommand>,
        event_tx: mpsc::UnboundedSender<SyncEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            url,
            reconnect,
            open,
            command_rx,
            event_tx,
            cancel,
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.reconnect.min_delay())
            .with_max_delay(self.reconnect.max_delay())
            .with_factor(2.0)
            .with_max_times(self.reconnect.max_attempts)
            .build()
    }

    /// Run until cancelled, until every command sender is gone, or until
    /// reconnect attempts run out.
    pub async fn run(mut self) {
        log::info!("SyncWorker started ({})", self.url);
        let mut backoff = self.backoff();

        loop {
            let connected = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    log::info!("SyncWorker shutting down (cancellation requested)");
                    break;
                }
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((stream, _response)) => {
                    log::info!("sync channel open ({})", self.url);
                    backoff = self.backoff();
                    self.discard_queued("stale");
                    self.open.store(true, Ordering::SeqCst);
                    let _ = self.event_tx.send(SyncEvent::Connected);

                    let exit = self.pump(stream).await;

                    self.open.store(false, Ordering::SeqCst);
                    self.discard_queued("disconnected");
                    let _ = self.event_tx.send(SyncEvent::Disconnected);
                    if exit == PumpExit::Shutdown {
                        break;
                    }
                    log::warn!("sync channel lost ({})", self.url);
                },
                Err(e) => {
                    log::warn!("sync channel connect failed ({}): {e}", self.url);
                    self.discard_queued("offline");
                },
            }

            let Some(delay) = backoff.next() else {
                log::warn!(
                    "SyncWorker giving up after {} reconnect attempts",
                    self.reconnect.max_attempts
                );
                let _ = self.event_tx.send(SyncEvent::GaveUp);
                break;
            };
            log::debug!("reconnecting in {delay:?}");
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    log::info!("SyncWorker shutting down (cancellation requested)");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.open.store(false, Ordering::SeqCst);
        self.discard_queued("stopped");
        log::info!("SyncWorker stopped");
    }

    async fn pump(&mut self, stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> PumpExit {
        let (mut write, mut read) = stream.split();
        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return PumpExit::Shutdown;
                }

                command = self.command_rx.recv() => match command {
                    Some(OutboundCommand::Publish(frame)) => {
                        if let Err(e) = write.send(Message::Text(frame.into())).await {
                            log::warn!("failed to write sync frame: {e}");
                            emit_sent(CHANNEL_SYNC_OUTBOUND_DROPPED, 0);
                            return PumpExit::Lost;
                        }
                    }
                    Some(OutboundCommand::Flush(done)) => {
                        let _ = done.send(());
                    }
                    None => {
                        let _ = write.send(Message::Close(None)).await;
                        return PumpExit::Shutdown;
                    }
                },

                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let _ = self.event_tx.send(SyncEvent::Inbound(text.as_str().to_owned()));
                    }
                    Some(Ok(Message::Close(reason))) => {
                        log::debug!("server closed sync channel: {reason:?}");
                        return PumpExit::Lost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::warn!("sync channel read failed: {e}");
                        return PumpExit::Lost;
                    }
                    None => return PumpExit::Lost,
                },
            }
        }
    }

    /// Drop queued frames; sends are fire-and-forget and never replayed.
    fn discard_queued(&mut self, why: &str) {
        let mut dropped = 0usize;
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                OutboundCommand::Publish(frame) => {
                    dropped += 1;
                    emit_sent(CHANNEL_SYNC_OUTBOUND_DROPPED, frame.len());
                },
                OutboundCommand::Flush(done) => {
                    let _ = done.send(());
                },
            }
        }
        if dropped > 0 {
            log::debug!("discarded {dropped} queued sync frames ({why})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn backoff_is_bounded_by_preferences() {
        let (_command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let worker = SyncWorker::new(
            Url::parse("ws://127.0.0.1:1/ws").unwrap(),
            ReconnectPreferences {
                min_delay_ms: 100,
                max_delay_ms: 300,
                max_attempts: 4,
            },
            Arc::new(AtomicBool::new(false)),
            command_rx,
            event_tx,
            CancellationToken::new(),
        );
        let delays: Vec<Duration> = worker.backoff().collect();
        assert_eq!(delays.len(), 4);
        assert_eq!(delays[0], Duration::from_millis(100));
        assert!(delays[1].abs_diff(Duration::from_millis(200)) < Duration::from_millis(1));
        assert_eq!(&delays[2..], &[Duration::from_millis(300), Duration::from_millis(300)]);
    }
}
