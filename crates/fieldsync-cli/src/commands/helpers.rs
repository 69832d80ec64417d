//! Helper utility functions for CLI commands

use anyhow::{Context, Result};
use fieldsync_core::config::ClientConfig;
use fieldsync_core::{Clock, ConnectivitySignal, SyncOrchestrator, SystemClock, WatchConnectivity};
use fieldsync_remote::{HttpRemote, RemoteSubmitter};
use fieldsync_storage::{DraftStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs, wired from the client config
pub struct App {
    pub config: ClientConfig,
    pub drafts: DraftStore,
    pub remote: Arc<HttpRemote>,
    pub connectivity: Arc<WatchConnectivity>,
    pub clock: Arc<dyn Clock>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl App {
    /// Open the local store and build the orchestrator; starts offline
    pub fn open() -> Result<Self> {
        let config = ClientConfig::load_default()?;
        let store = SqliteStore::open(Some(config.database_path()?))
            .context("Failed to open local store")?;
        let drafts = DraftStore::new(Arc::new(store));

        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| "http://localhost".to_string());
        let remote = Arc::new(HttpRemote::new(&api_url, config.api_token.clone())?);
        let connectivity = Arc::new(WatchConnectivity::new(false));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let orchestrator = Arc::new(SyncOrchestrator::new(
            drafts.clone(),
            remote.clone(),
            connectivity.clone(),
            clock.clone(),
        ));

        Ok(Self {
            config,
            drafts,
            remote,
            connectivity,
            clock,
            orchestrator,
        })
    }

    /// Probe the remote once and record the answer
    pub async fn detect_connectivity(&self) -> bool {
        if self.config.api_url.is_none() {
            log::warn!("No api_url configured; staying offline");
            return false;
        }

        let online = match self.remote.probe().await {
            Ok(()) => true,
            Err(e) => {
                log::info!("Remote unreachable: {e}");
                false
            }
        };
        self.connectivity.set_online(online);
        self.connectivity.is_online()
    }
}

/// Safely truncate a string to a maximum number of characters (not bytes).
/// This avoids panics when slicing multi-byte UTF-8 characters.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Guess a MIME type from a file extension
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Read an attachment and return (file name, content type, bytes)
pub fn read_attachment(path: &Path) -> Result<(String, String, Vec<u8>)> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("attachment")
        .to_string();
    Ok((file_name, content_type_for(path), data))
}
