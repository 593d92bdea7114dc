//! Remote mirroring of the dashboard state.
//!
//! The whole state is stored under one key of a key-value store. Local
//! changes are pushed as full snapshots; remote snapshots are polled and
//! adopted when newer. Failures only degrade the sync status to `local`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use url::Url;

use crate::error::SyncError;
use crate::state::{ChangeOrigin, DashboardState, DashboardStore, SyncStatus};

/// Key the state lives under in the remote database.
pub const STATE_KEY: &str = "dashboard_state";

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current remote snapshot, `None` when the key is empty.
    async fn fetch(&self) -> Result<Option<DashboardState>, SyncError>;

    async fn push(&self, state: &DashboardState) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// Firebase Realtime Database (REST)
// ---------------------------------------------------------------------------

pub struct FirebaseStore {
    client: reqwest::Client,
    endpoint: Url,
}

impl FirebaseStore {
    /// `database_url` is the database root, e.g.
    /// `https://<project>-default-rtdb.firebaseio.com`.
    pub fn new(database_url: &str, auth_token: Option<&str>) -> Result<Self, SyncError> {
        let mut base = database_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", database_url, e)))?;
        let mut endpoint = base
            .join(&format!("{}.json", STATE_KEY))
            .map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            endpoint.query_pairs_mut().append_pair("auth", token);
        }

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn fetch(&self) -> Result<Option<DashboardState>, SyncError> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Status { status, body });
        }

        let text = resp
            .text()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;
        decode_snapshot(&text)
    }

    async fn push(&self, state: &DashboardState) -> Result<(), SyncError> {
        let resp = self
            .client
            .put(self.endpoint.clone())
            .json(state)
            .send()
            .await
            .map_err(|e| SyncError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Status { status, body });
        }
        Ok(())
    }
}

/// Parse a REST response body. An absent key comes back as `null`.
fn decode_snapshot(body: &str) -> Result<Option<DashboardState>, SyncError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    DashboardState::from_json(trimmed)
        .map(Some)
        .map_err(SyncError::Decode)
}

// ---------------------------------------------------------------------------
// Sync loop
// ---------------------------------------------------------------------------

/// Fetch once and adopt the remote snapshot if newer. Returns whether the
/// local state changed.
pub async fn pull_once(store: &DashboardStore, remote: &dyn RemoteStore) -> bool {
    match remote.fetch().await {
        Ok(Some(snapshot)) => {
            store.set_sync_status(SyncStatus::Cloud);
            store.apply_remote(snapshot)
        }
        Ok(None) => {
            store.set_sync_status(SyncStatus::Cloud);
            false
        }
        Err(e) => {
            log::warn!("Sync: fetch failed: {}", e);
            store.set_sync_status(SyncStatus::Local);
            false
        }
    }
}

/// Push the current local snapshot.
pub async fn push_once(store: &DashboardStore, remote: &dyn RemoteStore) -> bool {
    let snapshot = store.snapshot();
    match remote.push(&snapshot).await {
        Ok(()) => {
            store.set_sync_status(SyncStatus::Cloud);
            true
        }
        Err(e) => {
            log::warn!("Sync: push failed: {}", e);
            store.set_sync_status(SyncStatus::Local);
            false
        }
    }
}

/// Push only when ours is the newest copy.
///
/// Fetches first: a remote snapshot at least as recent as the local one is
/// adopted (when strictly newer) and nothing is pushed. An unreachable
/// remote is left alone. Returns whether a push happened.
pub async fn push_if_newer(store: &DashboardStore, remote: &dyn RemoteStore) -> bool {
    let local_update = store.snapshot().last_update;
    match remote.fetch().await {
        Ok(Some(snapshot)) if snapshot.last_update >= local_update => {
            store.set_sync_status(SyncStatus::Cloud);
            log::info!(
                "Sync: remote copy from {} is not older than ours; not pushing",
                snapshot.last_update
            );
            store.apply_remote(snapshot);
            false
        }
        Ok(_) => push_once(store, remote).await,
        Err(e) => {
            log::warn!("Sync: fetch before push failed: {}; keeping change local", e);
            store.set_sync_status(SyncStatus::Local);
            false
        }
    }
}

/// Mirror the store to `remote`. Runs until the task is aborted.
///
/// Local changes are pushed as they happen; the remote is polled every
/// `poll_interval`. Changes that came from the remote are not pushed back.
pub async fn run_sync(
    store: Arc<DashboardStore>,
    remote: Arc<dyn RemoteStore>,
    poll_interval: Duration,
) {
    let mut events = store.subscribe();

    match remote.fetch().await {
        Ok(Some(snapshot)) => {
            store.set_sync_status(SyncStatus::Cloud);
            if store.apply_remote(snapshot) {
                log::info!("Sync: adopted remote state on startup");
            } else {
                // ours is newer
                push_once(&store, remote.as_ref()).await;
            }
        }
        Ok(None) => {
            log::info!("Sync: remote is empty; seeding it with local state");
            push_once(&store, remote.as_ref()).await;
        }
        Err(e) => {
            log::warn!("Sync: initial fetch failed: {}; working locally", e);
            store.set_sync_status(SyncStatus::Local);
        }
    }

    let mut poll = tokio::time::interval(poll_interval);
    poll.tick().await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.origin == ChangeOrigin::Local => {
                    push_once(&store, remote.as_ref()).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::debug!("Sync: skipped {} change events; pushing latest", skipped);
                    push_once(&store, remote.as_ref()).await;
                }
                Err(RecvError::Closed) => {
                    log::info!("Sync: store closed; stopping");
                    break;
                }
            },
            _ = poll.tick() => {
                pull_once(&store, remote.as_ref()).await;
            }
        }
    }
}
