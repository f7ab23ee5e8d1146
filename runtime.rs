/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Process runtime for the `tinydag` binary: tracing setup, the tokio
//! event loop and the four commands.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tinydag_core::{GraphSnapshot, GraphStore, ImportError, export_snapshot, parse_import};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::diagnostics::DiagnosticsState;
use crate::prefs::{AppPreferences, Command, PrefsError};
use crate::session::{EditorSession, InboundOutcome, ScriptError, SyncTransport, parse_script};
use crate::sync::{RemoteError, RemoteGraphApi, SyncChannel, SyncChannelParts, SyncEvent};

const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum RuntimeError {
    Prefs(PrefsError),
    Remote(RemoteError),
    Import(ImportError),
    Script(ScriptError),
    Io { path: PathBuf, message: String },
    Runtime(String),
    NotConnected,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefs(e) => write!(f, "{e}"),
            Self::Remote(e) => write!(f, "{e}"),
            Self::Import(e) => write!(f, "{e}"),
            Self::Script(e) => write!(f, "{e}"),
            Self::Io { path, message } => write!(f, "{}: {message}", path.display()),
            Self::Runtime(e) => write!(f, "failed to start runtime: {e}"),
            Self::NotConnected => write!(f, "sync channel did not open"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<PrefsError> for RuntimeError {
    fn from(e: PrefsError) -> Self {
        Self::Prefs(e)
    }
}

impl From<RemoteError> for RuntimeError {
    fn from(e: RemoteError) -> Self {
        Self::Remote(e)
    }
}

impl From<ImportError> for RuntimeError {
    fn from(e: ImportError) -> Self {
        Self::Import(e)
    }
}

impl From<ScriptError> for RuntimeError {
    fn from(e: ScriptError) -> Self {
        Self::Script(e)
    }
}

/// Install the fmt subscriber; `log` records are bridged into it.
pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!("tinydag: ignoring log filter {filter:?}: {e}");
        EnvFilter::new("info")
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run one command to completion on a single-threaded event loop.
pub fn run(command: Command, prefs: AppPreferences) -> Result<(), RuntimeError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| RuntimeError::Runtime(e.to_string()))?;
    let mut diagnostics = DiagnosticsState::new();
    let result = runtime.block_on(run_command(command, prefs));
    diagnostics.log_summary();
    result
}

async fn run_command(command: Command, prefs: AppPreferences) -> Result<(), RuntimeError> {
    let api = RemoteGraphApi::new(&prefs)?;
    match command {
        Command::Mirror { duration } => {
            let mut live = LiveSession::start(&prefs, &api).await?;
            live.mirror(duration.map(Duration::from_secs)).await;
            live.shutdown().await;
            Ok(())
        },
        Command::Replay { stay, script } => {
            let inputs = parse_script(&read_text(&script)?)?;
            let mut live = LiveSession::start(&prefs, &api).await?;
            if !live.wait_connected(connect_timeout(&prefs)).await {
                log::warn!("replaying offline; edits will not be synchronized");
            }
            log::info!("replaying {} inputs from {}", inputs.len(), script.display());
            for input in inputs {
                live.drain_pending();
                live.session.dispatch(input);
            }
            if stay {
                live.mirror(None).await;
            }
            live.shutdown().await;
            Ok(())
        },
        Command::Import { file } => {
            let bytes = read_bytes(&file)?;
            parse_import(&bytes)?;
            let mut live = LiveSession::start(&prefs, &api).await?;
            if !live.wait_connected(connect_timeout(&prefs)).await {
                live.shutdown().await;
                return Err(RuntimeError::NotConnected);
            }
            live.session.import_bytes(&bytes)?;
            log::info!(
                "published {} nodes from {}",
                live.session.store().nodes().len(),
                file.display()
            );
            live.shutdown().await;
            Ok(())
        },
        Command::Export { file } => {
            let snapshot = api
                .fetch_snapshot()
                .await?
                .unwrap_or_else(GraphSnapshot::builtin_default);
            let text = export_snapshot(&snapshot)?;
            std::fs::write(&file, text).map_err(|e| RuntimeError::Io {
                path: file.clone(),
                message: e.to_string(),
            })?;
            log::info!("exported {} nodes to {}", snapshot.nodes.len(), file.display());
            Ok(())
        },
    }
}

fn connect_timeout(prefs: &AppPreferences) -> Duration {
    prefs.request_timeout() + prefs.reconnect.max_delay()
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, RuntimeError> {
    std::fs::read(path).map_err(|e| RuntimeError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read_text(path: &Path) -> Result<String, RuntimeError> {
    std::fs::read_to_string(path).map_err(|e| RuntimeError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Initial graph: the server's state if it holds any, else the built-in default.
pub async fn seed_snapshot(api: &RemoteGraphApi) -> GraphSnapshot {
    match api.fetch_snapshot().await {
        Ok(Some(snapshot)) => {
            log::info!("loaded saved graph ({} nodes)", snapshot.nodes.len());
            snapshot
        },
        Ok(None) => {
            log::info!("no saved graph on server; using default graph");
            GraphSnapshot::builtin_default()
        },
        Err(e) => {
            log::warn!("snapshot fetch failed ({e}); using default graph");
            GraphSnapshot::builtin_default()
        },
    }
}

/// An editor session wired to a running sync worker.
struct LiveSession {
    session: EditorSession<SyncChannel>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    worker: JoinHandle<()>,
    cancel: CancellationToken,
    worker_stopped: bool,
}

impl LiveSession {
    async fn start(prefs: &AppPreferences, api: &RemoteGraphApi) -> Result<Self, RuntimeError> {
        let store = GraphStore::from_snapshot(seed_snapshot(api).await);
        let cancel = CancellationToken::new();
        let SyncChannelParts {
            channel,
            events,
            worker,
        } = SyncChannel::spawn(prefs.sync_url()?, prefs.reconnect.clone(), cancel.clone());
        let channel = if prefs.archive_mutations {
            channel.with_archive(api.clone())
        } else {
            channel
        };
        let session = EditorSession::new(store, prefs.screen_rect(), prefs.canvas_config(), channel)
            .with_archive(prefs.archive_mutations);
        Ok(Self {
            session,
            events,
            worker,
            cancel,
            worker_stopped: false,
        })
    }

    /// Returns `false` once the worker has stopped for good.
    fn handle_event(&mut self, event: SyncEvent) -> bool {
        match event {
            SyncEvent::Connected => log::info!("sync channel connected"),
            SyncEvent::Disconnected => {
                log::warn!("sync channel disconnected; local edits stay local until it reconnects")
            },
            SyncEvent::Inbound(text) => {
                if self.session.apply_inbound(&text) == InboundOutcome::Applied {
                    let store = self.session.store();
                    log::info!(
                        "applied remote graph: {} nodes, {} connections",
                        store.nodes().len(),
                        store.connections().len()
                    );
                }
            },
            SyncEvent::GaveUp => {
                self.worker_stopped = true;
                return false;
            },
        }
        true
    }

    /// Apply every event already delivered, without waiting.
    fn drain_pending(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
        }
    }

    async fn wait_connected(&mut self, timeout: Duration) -> bool {
        if self.session.transport().is_open() {
            return true;
        }
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => return false,
                event = self.events.recv() => match event {
                    Some(SyncEvent::Connected) => {
                        self.handle_event(SyncEvent::Connected);
                        return true;
                    }
                    Some(event) => {
                        if !self.handle_event(event) {
                            return false;
                        }
                    }
                    None => return false,
                },
            }
        }
    }

    /// Follow remote updates until Ctrl-C, the optional duration elapses or
    /// the worker gives up.
    async fn mirror(&mut self, duration: Option<Duration>) {
        if self.worker_stopped {
            return;
        }
        let deadline = async {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    log::info!("interrupted");
                    break;
                }
                _ = &mut deadline => break,
                event = self.events.recv() => match event {
                    Some(event) => {
                        if !self.handle_event(event) {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }

    async fn shutdown(mut self) {
        if tokio::time::timeout(FLUSH_TIMEOUT, self.session.transport().flush())
            .await
            .is_err()
        {
            log::warn!("timed out waiting for queued sync frames");
        }
        self.drain_pending();
        self.cancel.cancel();
        if let Err(e) = self.worker.await {
            log::warn!("sync worker ended abnormally: {e}");
        }
    }
}
