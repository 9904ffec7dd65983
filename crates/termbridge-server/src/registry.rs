//! Session registry: the set of live sessions, keyed by id.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use termbridge_common::SessionId;
use termbridge_pty::Geometry;
use tokio::sync::{Notify, RwLock};
use tokio_util::sync::CancellationToken;

/// What the registry knows about a live session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub peer: SocketAddr,
    pub pid: Option<u32>,
    pub program: String,
    pub geometry: Geometry,
    pub started_at: DateTime<Utc>,
}

struct Entry {
    summary: SessionSummary,
    cancel: CancellationToken,
    seq: u64,
}

/// Thread-safe session registry.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Entry>>>,
    emptied: Arc<Notify>,
    next_seq: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Returns false if the id is already taken.
    pub async fn insert(&self, summary: SessionSummary, cancel: CancellationToken) -> bool {
        let mut map = self.sessions.write().await;
        if map.contains_key(&summary.id) {
            return false;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        map.insert(summary.id.clone(), Entry { summary, cancel, seq });
        true
    }

    /// Remove a session. Removing an unknown id is a no-op.
    pub async fn remove(&self, id: &SessionId) -> Option<SessionSummary> {
        let mut map = self.sessions.write().await;
        let removed = map.remove(id).map(|entry| entry.summary);
        if removed.is_none() {
            tracing::debug!(session = %id.short(), "session already removed");
        }
        if map.is_empty() {
            self.emptied.notify_waiters();
        }
        removed
    }

    pub async fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Snapshot of live sessions, oldest first.
    pub async fn list_active(&self) -> Vec<SessionSummary> {
        let map = self.sessions.read().await;
        let mut entries: Vec<&Entry> = map.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries.into_iter().map(|entry| entry.summary.clone()).collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Ask every live session to shut down. Sessions deregister themselves
    /// once their teardown completes. Returns how many were signalled.
    pub async fn shutdown_all(&self) -> usize {
        let map = self.sessions.read().await;
        for entry in map.values() {
            entry.cancel.cancel();
        }
        map.len()
    }

    /// Resolve once the registry holds no sessions.
    pub async fn wait_until_empty(&self) {
        loop {
            let emptied = self.emptied.notified();
            tokio::pin!(emptied);
            emptied.as_mut().enable();
            if self.sessions.read().await.is_empty() {
                return;
            }
            emptied.await;
        }
    }
}
