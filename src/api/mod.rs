//! Response envelope and error types for the KinFin analysis server
//!
//! Every JSON endpoint wraps its payload in a uniform envelope:
//! `{status: "success"|"error", data?: ..., error?: {message}}`.
//! The envelope is validated exactly once, at the client boundary; the
//! rest of the crate only ever sees `Result<T, ApiError>`.

mod types;

pub use types::{
    AttributesTaxonsets, BatchStatusEntry, ClusteringSet, ColumnDescription, InitRequest,
    InitResponse, PageQuery, Paginated, PairwiseAnalysis, RunSummary, StatusResponse, TableRow,
    ValidProteomeId,
};

use serde::Deserialize;
use thiserror::Error;

/// Header carrying the session identifier on session-scoped requests
pub const SESSION_HEADER: &str = "x-session-id";

/// Errors surfaced by the API gateway client
///
/// Transport failures, non-2xx responses, and `status: "error"` envelopes
/// are all normalized here; callers never inspect raw response shapes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server error: {message}")]
    Envelope { message: String },

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("session results have expired on the server")]
    SessionExpired,
}

/// Uniform response envelope returned by every JSON endpoint
///
/// `data` and `error` are plain `Option` fields so a missing key reads as
/// `None` without imposing a `Default` bound on the payload type.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: Option<T>,
    pub error: Option<EnvelopeError>,
}

/// Error detail carried by an `"error"` envelope
#[derive(Debug, Deserialize)]
pub struct EnvelopeError {
    pub message: String,
}

impl<T> Envelope<T> {
    /// Collapse the loose `{status, data, error}` shape into a tagged result
    pub fn into_result(self) -> Result<T, ApiError> {
        if self.status == "success" {
            self.data
                .ok_or_else(|| ApiError::Decode("success envelope with no data field".into()))
        } else {
            let message = self
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown server error".to_string());
            Err(ApiError::Envelope { message })
        }
    }
}
