//! Session model - analysis runs and their lifecycle

mod store;

pub use store::{SessionMeta, SessionStore, SharedStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One taxon-definition record of an analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonRecord {
    /// Proteome/taxon identifier, e.g. an assembly accession
    pub taxon_id: String,

    /// Clade label the taxon belongs to
    pub clade: String,

    /// Host-group label used for set comparisons
    pub host_group: String,
}

impl TaxonRecord {
    pub fn new(
        taxon_id: impl Into<String>,
        clade: impl Into<String>,
        host_group: impl Into<String>,
    ) -> Self {
        Self {
            taxon_id: taxon_id.into(),
            clade: clade.into(),
            host_group: host_group.into(),
        }
    }
}

/// Lifecycle state of a submitted analysis run
///
/// Transitions only move forward: `Submitted -> Polling -> (Complete |
/// Failed | TimedOut)`, then `Complete -> Expired` once the server discards
/// the results. A batch refresh may jump any unfinished state straight to
/// `Complete` or `Expired`, since the server can finish a run while no
/// local poll loop is watching it. The single backward edge,
/// `Polling -> Submitted`, exists for an explicitly cancelled poll so the
/// run can be watched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Submitted to the server, not yet watched
    Submitted,
    /// A polling loop is checking the run
    Polling,
    /// Run finished and results are retrievable
    Complete,
    /// A status request failed; polling stopped
    Failed,
    /// Polling hit its attempt ceiling without completion
    TimedOut,
    /// Run finished but the server has discarded the results
    Expired,
}

impl SessionStatus {
    /// Whether the run has finished on the server
    pub fn is_complete(&self) -> bool {
        matches!(self, SessionStatus::Complete | SessionStatus::Expired)
    }

    /// Whether `next` is a legal transition from this state
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Submitted, Polling) => true,
            (Polling, Complete) | (Polling, Failed) | (Polling, TimedOut) => true,
            // cancelled poll returns the run to the queue
            (Polling, Submitted) => true,
            (Complete, Expired) => true,
            // a batch refresh can observe completion without a local poll loop
            (Submitted | Failed | TimedOut, Complete | Expired) => true,
            // a failed or timed-out run may be watched again
            (Failed, Polling) | (TimedOut, Polling) => true,
            _ => false,
        }
    }
}

/// One submitted analysis run, as tracked by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned opaque identifier, unique across the store
    pub session_id: String,

    /// User-assigned display label, mutable
    pub name: String,

    /// Taxon-definition records supplied at submission, immutable
    pub config: Vec<TaxonRecord>,

    /// Optional clustering-dataset grouping, set at submission
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub cluster_name: Option<String>,

    /// Lifecycle state; see [`SessionStatus`]
    pub status: SessionStatus,

    /// When the server will discard this run's results
    #[serde(default)]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a freshly submitted session record
    pub fn new(session_id: impl Into<String>, name: impl Into<String>, config: Vec<TaxonRecord>) -> Self {
        Self {
            session_id: session_id.into(),
            name: name.into(),
            config,
            cluster_id: None,
            cluster_name: None,
            status: SessionStatus::Submitted,
            expiry_date: None,
        }
    }

    pub fn with_cluster(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.cluster_id = Some(id.into());
        self.cluster_name = Some(name.into());
        self
    }

    /// Whether the results are past their server-side expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.map(|e| now > e).unwrap_or(false)
    }
}
