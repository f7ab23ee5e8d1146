/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Command line and on-disk preferences.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bpaf::Bpaf;
use serde::{Deserialize, Serialize};
use tinydag_canvas::{
    CanvasConfig, NodeMetrics, ScreenPoint, ScreenRect, ScreenSize, ZoomLimits,
};
use url::Url;

const PREFERENCES_FILE: &str = "preferences.toml";

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
/// Headless client for a shared tinydag graph
pub struct CommandLine {
    /// Preferences file to load instead of the per-user default
    #[bpaf(long("config"), argument("PATH"))]
    pub config: Option<PathBuf>,
    /// Server base URL, e.g. http://localhost:8000
    #[bpaf(long("server"), argument("URL"))]
    pub server: Option<String>,
    /// Log filter directive, e.g. `debug` or `tinydag=trace`
    #[bpaf(long("log"), argument("FILTER"))]
    pub log: Option<String>,
    #[bpaf(external(command))]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Bpaf)]
pub enum Command {
    /// Follow the shared graph and log every applied snapshot
    #[bpaf(command("mirror"))]
    Mirror {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[bpaf(long("duration"), argument("SECS"))]
        duration: Option<u64>,
    },
    /// Drive the editor from a JSON-lines input script
    #[bpaf(command("replay"))]
    Replay {
        /// Keep mirroring after the script finishes
        #[bpaf(long("stay"), switch)]
        stay: bool,
        #[bpaf(positional("SCRIPT"))]
        script: PathBuf,
    },
    /// Load a graph file and publish it as the shared state
    #[bpaf(command("import"))]
    Import {
        #[bpaf(positional("FILE"))]
        file: PathBuf,
    },
    /// Write the current shared graph to a file
    #[bpaf(command("export"))]
    Export {
        #[bpaf(positional("FILE"))]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasPreferences {
    pub screen_width: f64,
    pub screen_height: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub hit_tolerance_px: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CanvasPreferences {
    fn default() -> Self {
        Self {
            screen_width: 1000.0,
            screen_height: 600.0,
            node_width: 160.0,
            node_height: 80.0,
            hit_tolerance_px: 20.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPreferences {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Consecutive failed attempts before the sync worker gives up.
    pub max_attempts: usize,
}

impl Default for ReconnectPreferences {
    fn default() -> Self {
        Self {
            min_delay_ms: 250,
            max_delay_ms: 5_000,
            max_attempts: 8,
        }
    }
}

impl ReconnectPreferences {
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppPreferences {
    pub server_url: String,
    pub sync_path: String,
    pub snapshot_path: String,
    pub archive_path: String,
    /// POST the snapshot after node adds, removals and saves to `archive_path` as well.
    pub archive_mutations: bool,
    pub request_timeout_secs: u64,
    pub log_filter: Option<String>,
    pub canvas: CanvasPreferences,
    pub reconnect: ReconnectPreferences,
}

impl Default for AppPreferences {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            sync_path: "/ws".to_string(),
            snapshot_path: "/api/graph".to_string(),
            archive_path: "/save-temp-file".to_string(),
            archive_mutations: false,
            request_timeout_secs: 4,
            log_filter: None,
            canvas: CanvasPreferences::default(),
            reconnect: ReconnectPreferences::default(),
        }
    }
}

impl AppPreferences {
    /// `<config_dir>/tinydag/preferences.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tinydag").join(PREFERENCES_FILE))
    }

    /// Load from an explicit path (which must exist), else the per-user
    /// default path if present, else built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PrefsError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, PrefsError> {
        let text = std::fs::read_to_string(path).map_err(|e| PrefsError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let prefs = Self::from_toml_str(&text)?;
        log::debug!("loaded preferences from {}", path.display());
        Ok(prefs)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PrefsError> {
        let prefs: Self = toml::from_str(text).map_err(|e| PrefsError::Parse(e.to_string()))?;
        prefs.validate()?;
        Ok(prefs)
    }

    /// Fold command-line overrides in.
    pub fn apply_command_line(&mut self, cli: &CommandLine) {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(filter) = &cli.log {
            self.log_filter = Some(filter.clone());
        }
    }

    pub fn validate(&self) -> Result<(), PrefsError> {
        self.server_base()?;
        let canvas = &self.canvas;
        if !(canvas.screen_width > 0.0 && canvas.screen_height > 0.0) {
            return Err(PrefsError::Invalid("canvas screen size must be positive".into()));
        }
        if !(canvas.node_width > 0.0 && canvas.node_height > 0.0) {
            return Err(PrefsError::Invalid("canvas node size must be positive".into()));
        }
        if !(canvas.min_zoom > 0.0 && canvas.min_zoom <= canvas.max_zoom) {
            return Err(PrefsError::Invalid(format!(
                "zoom range [{}, {}] is empty",
                canvas.min_zoom, canvas.max_zoom
            )));
        }
        if canvas.hit_tolerance_px.is_sign_negative() {
            return Err(PrefsError::Invalid("hit tolerance must not be negative".into()));
        }
        Ok(())
    }

    pub fn server_base(&self) -> Result<Url, PrefsError> {
        let url = Url::parse(&self.server_url)
            .map_err(|e| PrefsError::InvalidUrl(format!("{}: {e}", self.server_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(PrefsError::InvalidUrl(format!(
                "{}: unsupported scheme {other:?}",
                self.server_url
            ))),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, PrefsError> {
        self.server_base()?
            .join(path)
            .map_err(|e| PrefsError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Socket URL: the server URL with `http`/`https` mapped to `ws`/`wss`.
    pub fn sync_url(&self) -> Result<Url, PrefsError> {
        let mut url = self.endpoint(&self.sync_path)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| PrefsError::InvalidUrl(format!("cannot use {scheme} for {url}")))?;
        Ok(url)
    }

    pub fn snapshot_url(&self) -> Result<Url, PrefsError> {
        self.endpoint(&self.snapshot_path)
    }

    pub fn archive_url(&self) -> Result<Url, PrefsError> {
        self.endpoint(&self.archive_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn screen_rect(&self) -> ScreenRect {
        ScreenRect::new(
            ScreenPoint::origin(),
            ScreenSize::new(self.canvas.screen_width, self.canvas.screen_height),
        )
    }

    pub fn canvas_config(&self) -> CanvasConfig {
        CanvasConfig {
            node_metrics: NodeMetrics::new(self.canvas.node_width, self.canvas.node_height),
            hit_tolerance_px: self.canvas.hit_tolerance_px,
            zoom_limits: ZoomLimits::new(self.canvas.min_zoom, self.canvas.max_zoom),
        }
    }

    /// Filter for the log subscriber: explicit preference, then `RUST_LOG`, then `info`.
    pub fn effective_log_filter(&self) -> String {
        self.log_filter
            .clone()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .filter(|filter| !filter.trim().is_empty())
            .unwrap_or_else(|| "info".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefsError {
    Io { path: PathBuf, message: String },
    Parse(String),
    InvalidUrl(String),
    Invalid(String),
}

impl std::fmt::Display for PrefsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read preferences {}: {message}", path.display())
            },
            Self::Parse(e) => write!(f, "invalid preferences file: {e}"),
            Self::InvalidUrl(e) => write!(f, "invalid server url {e}"),
            Self::Invalid(e) => write!(f, "invalid preferences: {e}"),
        }
    }
}

impl std::error::Error for PrefsError {}
