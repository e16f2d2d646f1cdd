//! Session store - single source of truth for all known analysis runs
//!
//! Mutations optionally persist a JSON snapshot to disk so sessions survive
//! a restart. Writes are asynchronous and best-effort: the store offers no
//! read-after-write guarantee, which is acceptable for this data.

use super::{Session, SessionStatus};
use crate::api::BatchStatusEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Store handle shared between the CLI and the polling coordinator
pub type SharedStore = Arc<Mutex<SessionStore>>;

/// Partial metadata merged into an existing session by [`SessionStore::update_meta`]
#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub status: Option<SessionStatus>,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl SessionMeta {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            expiry_date: None,
        }
    }
}

/// All known sessions, keyed by server-assigned session id
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    /// Snapshot path; `None` keeps the store purely in memory
    path: Option<PathBuf>,
}

impl SessionStore {
    /// Create an empty in-memory store (no persistence)
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            path: None,
        }
    }

    /// Create a store that snapshots to `path` after each mutation
    pub fn with_storage(path: impl Into<PathBuf>) -> Self {
        Self {
            sessions: HashMap::new(),
            path: Some(path.into()),
        }
    }

    /// Load a persisted store from `path`, or start empty if absent
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sessions = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read session store at {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("corrupt session store at {}", path.display()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            sessions,
            path: Some(path),
        })
    }

    /// Insert a session record; an existing record with the same id is
    /// replaced (last write wins — this doubles as metadata refresh on
    /// re-submission)
    pub fn create(&mut self, session: Session) {
        if self.sessions.contains_key(&session.session_id) {
            tracing::debug!(session_id = %session.session_id, "overwriting existing session record");
        }
        self.sessions.insert(session.session_id.clone(), session);
        self.schedule_save();
    }

    /// Change a session's display name; no-op if the id is unknown
    pub fn rename(&mut self, session_id: &str, new_name: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.name = new_name.to_string();
            self.schedule_save();
        }
    }

    /// Remove a session record; no-op if absent
    pub fn delete(&mut self, session_id: &str) {
        if self.sessions.remove(session_id).is_some() {
            self.schedule_save();
        }
    }

    /// Merge status/expiry into an existing record; no-op if absent.
    /// Backward status moves are refused, keeping transitions forward-only.
    pub fn update_meta(&mut self, session_id: &str, meta: SessionMeta) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        if let Some(status) = meta.status {
            if session.status.can_transition_to(status) {
                session.status = status;
            } else {
                tracing::warn!(
                    session_id,
                    from = ?session.status,
                    to = ?status,
                    "refusing backward status transition"
                );
            }
        }
        if let Some(expiry) = meta.expiry_date {
            session.expiry_date = Some(expiry);
        }
        self.schedule_save();
    }

    /// Apply a batch status response: a session is complete iff the server
    /// reports `"completed"`, and a completed session past its expiry flips
    /// to `Expired`. Sessions the server did not report are untouched.
    pub fn apply_batch_status(&mut self, entries: &[BatchStatusEntry]) {
        let now = Utc::now();
        for entry in entries {
            let Some(session) = self.sessions.get_mut(&entry.session_id) else {
                continue;
            };
            if let Some(expiry) = entry.expiry_date {
                session.expiry_date = Some(expiry);
            }
            if entry.is_complete() {
                let next = if session.is_expired_at(now) {
                    SessionStatus::Expired
                } else {
                    SessionStatus::Complete
                };
                if session.status.can_transition_to(next) {
                    session.status = next;
                }
            }
        }
        self.schedule_save();
    }

    /// Look up a single session
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// All session ids, sorted for stable output
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All sessions, sorted by display name then id
    pub fn list(&self) -> Vec<&Session> {
        let mut sessions: Vec<_> = self.sessions.values().collect();
        sessions.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions
    }

    /// Write a snapshot synchronously; used at shutdown
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_snapshot_sync(path, &self.sessions)
    }

    /// Queue an asynchronous snapshot write after a mutation
    fn schedule_save(&self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let snapshot = self.sessions.clone();
        tokio::spawn(async move {
            if let Err(e) = write_snapshot(&path, &snapshot).await {
                tracing::warn!(path = %path.display(), "session store snapshot failed: {e:#}");
            }
        });
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn write_snapshot(path: &Path, sessions: &HashMap<String, Session>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(sessions)?;
    tokio::fs::write(path, content).await?;
    Ok(())
}

fn write_snapshot_sync(path: &Path, sessions: &HashMap<String, Session>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(sessions)?;
    std::fs::write(path, content)?;
    Ok(())
}
