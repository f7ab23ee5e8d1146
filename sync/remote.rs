/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! HTTP side of the server: initial snapshot fetch and the mutation archive.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;
use tinydag_core::{Connection, GraphSnapshot, Node};
use url::Url;

use crate::prefs::AppPreferences;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    InvalidUrl(String),
    Client(String),
    Network(String),
    HttpStatus(u16),
    Body(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUrl(e) => write!(f, "invalid url: {e}"),
            Self::Client(e) => write!(f, "failed to build http client: {e}"),
            Self::Network(e) => write!(f, "network error: {e}"),
            Self::HttpStatus(status) => write!(f, "server answered {status}"),
            Self::Body(e) => write!(f, "unreadable response body: {e}"),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Snapshot endpoint body. The server may omit `connections`.
#[derive(Debug, Default, Deserialize)]
struct SnapshotResponse {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    connections: Vec<Connection>,
}

#[derive(Debug, Serialize)]
struct ArchiveRequest<'a> {
    filename: String,
    data: &'a GraphSnapshot,
}

#[derive(Clone, Debug)]
pub struct RemoteGraphApi {
    client: reqwest::Client,
    snapshot_url: Url,
    archive_url: Url,
}

impl RemoteGraphApi {
    pub fn new(prefs: &AppPreferences) -> Result<Self, RemoteError> {
        let snapshot_url = prefs
            .snapshot_url()
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        let archive_url = prefs
            .archive_url()
            .map_err(|e| RemoteError::InvalidUrl(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(prefs.request_timeout())
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;
        Ok(Self {
            client,
            snapshot_url,
            archive_url,
        })
    }

    /// Prior state held by the server, or `None` when it holds no nodes.
    pub async fn fetch_snapshot(&self) -> Result<Option<GraphSnapshot>, RemoteError> {
        let response = self
            .client
            .get(self.snapshot_url.clone())
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::HttpStatus(status.as_u16()));
        }
        let body: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Body(e.to_string()))?;
        if body.nodes.is_empty() {
            return Ok(None);
        }
        Ok(Some(GraphSnapshot {
            nodes: body.nodes,
            connections: body.connections,
        }))
    }

    /// POST a snapshot to the archive endpoint. Returns the file name used.
    pub async fn save_temp_file(&self, snapshot: &GraphSnapshot) -> Result<String, RemoteError> {
        let filename = archive_filename(OffsetDateTime::now_utc());
        let response = self
            .client
            .post(self.archive_url.clone())
            .json(&ArchiveRequest {
                filename: filename.clone(),
                data: snapshot,
            })
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::HttpStatus(status.as_u16()));
        }
        log::debug!("archived graph as {filename}");
        Ok(filename)
    }
}

/// `temp_state_<UTC timestamp>.json`, with `:` and `.` replaced by `-`.
pub fn archive_filename(at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!(
            "[year]-[month]-[day]T[hour]-[minute]-[second]-[subsecond digits:3]Z"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("temp_state_{stamp}.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn archive_filename_is_path_safe() {
        let name = archive_filename(datetime!(2026-03-04 05:06:07.089 UTC));
        assert_eq!(name, "temp_state_2026-03-04T05-06-07-089Z.json");
    }

    #[test]
    fn snapshot_response_tolerates_missing_connections() {
        let body: SnapshotResponse =
            serde_json::from_str(r#"{"nodes": [{"id": 1, "x": 0, "y": 0, "name": "A"}]}"#).unwrap();
        assert_eq!(body.nodes.len(), 1);
        assert!(body.connections.is_empty());
    }

    #[test]
    fn api_uses_configured_endpoints() {
        let prefs = AppPreferences {
            server_url: "http://127.0.0.1:9100".to_string(),
            ..AppPreferences::default()
        };
        let api = RemoteGraphApi::new(&prefs).unwrap();
        assert_eq!(api.snapshot_url.as_str(), "http://127.0.0.1:9100/api/graph");
        assert_eq!(api.archive_url.as_str(), "http://127.0.0.1:9100/save-temp-file");
    }
}
