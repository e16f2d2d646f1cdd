//! Wire types for the KinFin analysis server endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::TaxonRecord;

/// Body of `POST /init` — submits a new analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    /// Ordered taxon-definition records; immutable once submitted
    pub config: Vec<TaxonRecord>,

    /// Optional clustering-dataset identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    /// Whether the advanced configuration form was used
    pub is_advanced: bool,
}

/// Response of `POST /init`
#[derive(Debug, Clone, Deserialize)]
pub struct InitResponse {
    pub session_id: String,
}

/// Response of `GET /status` for a single session
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    pub is_complete: bool,
}

/// One record in the `POST /status` batch response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusEntry {
    pub session_id: String,

    /// Remote lifecycle label; a session is complete iff this is `"completed"`
    pub status: String,

    /// When the server will discard this session's results
    #[serde(rename = "expiryDate", skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl BatchStatusEntry {
    /// The completion flag the dashboard derives from the remote label
    pub fn is_complete(&self) -> bool {
        self.status == "completed"
    }
}

/// Page selection for paginated endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
        }
    }
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

/// A page of rows from a tabular endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    // a path default keeps serde from requiring `T: Default`
    #[serde(default = "Vec::new")]
    pub entries: Vec<T>,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_entries: u64,
}

/// One row of a dynamic results table; column names come from the server
pub type TableRow = serde_json::Map<String, serde_json::Value>;

/// Response of `GET /run-summary` — free-form key/value summary
#[derive(Debug, Clone, Deserialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub fields: TableRow,
}

/// Response of `GET /available-attributes-taxonsets`
#[derive(Debug, Clone, Deserialize)]
pub struct AttributesTaxonsets {
    pub attributes: Vec<String>,
    pub taxon_sets: Vec<String>,
}

/// One entry of `GET /valid-proteome-ids`
#[derive(Debug, Clone, Deserialize)]
pub struct ValidProteomeId {
    pub proteome_id: String,
    #[serde(default)]
    pub species: Option<String>,
}

/// One entry of `GET /clustering-sets`
#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of `GET /column-descriptions`
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDescription {
    pub column: String,
    pub description: String,
    /// Source file the column appears in; used for filtering
    #[serde(default)]
    pub source_file: Option<String>,
}

/// Response of `GET /pairwise-analysis/{attribute}`
#[derive(Debug, Clone, Deserialize)]
pub struct PairwiseAnalysis {
    #[serde(flatten)]
    pub fields: TableRow,
}
