//! Polling coordinator - watches submitted runs until they finish
//!
//! Each watched session gets its own spawned loop that asks the server
//! "is this run complete?" at a fixed interval, with a hard attempt
//! ceiling. Loops are isolated: a failure or timeout in one never affects
//! another. The registry of in-flight loops doubles as the per-session
//! "polling in progress" flag and makes every loop cancellable.

use super::{PollConfig, PollEvent, PollOutcome};
use crate::client::StatusProbe;
use crate::session::{SessionMeta, SessionStatus, SharedStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Callback invoked exactly once when a watched run completes;
/// the dashboard used this slot to navigate to the results view.
pub type OnComplete = Box<dyn FnOnce(&str) + Send + 'static>;

/// Registry of in-flight polling loops, keyed by session id
pub struct PollCoordinator {
    probe: Arc<dyn StatusProbe>,
    store: SharedStore,
    config: PollConfig,
    events: mpsc::Sender<PollEvent>,
    active: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl PollCoordinator {
    pub fn new(
        probe: Arc<dyn StatusProbe>,
        store: SharedStore,
        config: PollConfig,
        events: mpsc::Sender<PollEvent>,
    ) -> Self {
        Self {
            probe,
            store,
            config,
            events,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start polling a session until it completes, fails, or times out.
    ///
    /// Returns `false` without spawning anything if the session is already
    /// being polled — checks for one session are strictly sequential.
    pub async fn watch(&self, session_id: impl Into<String>) -> bool {
        self.watch_with(session_id, None).await
    }

    /// [`watch`](Self::watch) with an optional completion callback
    pub async fn watch_with(
        &self,
        session_id: impl Into<String>,
        on_complete: Option<OnComplete>,
    ) -> bool {
        let session_id = session_id.into();
        let mut active = self.active.lock().await;
        if active.contains_key(&session_id) {
            tracing::debug!(%session_id, "already polling, ignoring watch request");
            return false;
        }

        let loop_ctx = PollLoop {
            probe: Arc::clone(&self.probe),
            store: Arc::clone(&self.store),
            config: self.config,
            events: self.events.clone(),
            active: Arc::clone(&self.active),
        };
        let id = session_id.clone();
        let handle = tokio::spawn(async move {
            loop_ctx.run(id, on_complete).await;
        });
        active.insert(session_id, handle);
        true
    }

    /// Whether a polling loop is currently running for this session
    pub async fn is_polling(&self, session_id: &str) -> bool {
        self.active.lock().await.contains_key(session_id)
    }

    /// Session ids with a loop in flight
    pub async fn polling_sessions(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.active.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop a session's polling loop before it reaches a terminal state.
    ///
    /// The run returns to `Submitted` so it can be watched again. Returns
    /// `false` if no loop was running for this id.
    pub async fn cancel(&self, session_id: &str) -> bool {
        let handle = self.active.lock().await.remove(session_id);
        let Some(handle) = handle else {
            return false;
        };
        handle.abort();
        self.store
            .lock()
            .await
            .update_meta(session_id, SessionMeta::status(SessionStatus::Submitted));
        let _ = self
            .events
            .send(PollEvent {
                session_id: session_id.to_string(),
                outcome: PollOutcome::Cancelled,
            })
            .await;
        tracing::info!(session_id, "polling cancelled");
        true
    }
}

/// Everything one spawned loop needs, detached from the coordinator
struct PollLoop {
    probe: Arc<dyn StatusProbe>,
    store: SharedStore,
    config: PollConfig,
    events: mpsc::Sender<PollEvent>,
    active: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl PollLoop {
    async fn run(self, session_id: String, on_complete: Option<OnComplete>) {
        self.store
            .lock()
            .await
            .update_meta(&session_id, SessionMeta::status(SessionStatus::Polling));

        let mut outcome = PollOutcome::TimedOut;
        for attempt in 1..=self.config.max_attempts {
            sleep(self.config.interval).await;
            match self.probe.is_complete(&session_id).await {
                Ok(true) => {
                    tracing::info!(%session_id, attempt, "analysis complete");
                    outcome = PollOutcome::Complete;
                    break;
                }
                Ok(false) => {
                    tracing::debug!(%session_id, attempt, "analysis still running");
                }
                Err(e) => {
                    tracing::warn!(%session_id, attempt, "status check failed: {e}");
                    outcome = PollOutcome::Failed(e.to_string());
                    break;
                }
            }
        }

        let status = match &outcome {
            PollOutcome::Complete => SessionStatus::Complete,
            PollOutcome::Failed(_) => SessionStatus::Failed,
            PollOutcome::TimedOut => SessionStatus::TimedOut,
            // cancellation aborts the task; this arm is unreachable here
            PollOutcome::Cancelled => SessionStatus::Submitted,
        };
        self.store
            .lock()
            .await
            .update_meta(&session_id, SessionMeta::status(status));

        // clear the in-progress flag first; a panicking callback must not
        // leave the session marked as polling
        self.active.lock().await.remove(&session_id);

        if let (PollOutcome::Complete, Some(callback)) = (&outcome, on_complete) {
            callback(&session_id);
        }

        let _ = self
            .events
            .send(PollEvent {
                session_id,
                outcome,
            })
            .await;
    }
}
