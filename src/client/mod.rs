//! API gateway client for the KinFin analysis server
//!
//! Issues typed HTTP requests, attaches the `x-session-id` header on
//! session-scoped calls, and validates the response envelope at this
//! boundary. Session-scoped operations take the session id as an explicit
//! parameter; there is no ambient fallback identifier.

use crate::api::{
    ApiError, AttributesTaxonsets, BatchStatusEntry, ClusteringSet, ColumnDescription, Envelope,
    InitRequest, InitResponse, PageQuery, Paginated, PairwiseAnalysis, RunSummary, StatusResponse,
    TableRow, ValidProteomeId, SESSION_HEADER,
};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Checks whether a remote analysis run has finished
///
/// The polling coordinator depends on this seam rather than on the concrete
/// client, so its loop logic is testable without a live server.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn is_complete(&self, session_id: &str) -> Result<bool, ApiError>;
}

/// HTTP client for the analysis server
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit an analysis configuration, returning the new session id
    pub async fn init(&self, request: &InitRequest) -> Result<InitResponse, ApiError> {
        let req = self.http.post(self.url("/init")).json(request);
        decode_json(req.send().await?).await
    }

    /// Single-session run status
    pub async fn status(&self, session_id: &str) -> Result<StatusResponse, ApiError> {
        let req = self
            .http
            .get(self.url("/status"))
            .header(SESSION_HEADER, session_id);
        decode_json(req.send().await?).await
    }

    /// Batch status for a set of session ids
    pub async fn batch_status(
        &self,
        session_ids: &[String],
    ) -> Result<Vec<BatchStatusEntry>, ApiError> {
        let req = self.http.post(self.url("/status")).json(session_ids);
        decode_json(req.send().await?).await
    }

    /// Paginated lookup of taxon ids the server accepts in a configuration
    pub async fn valid_proteome_ids(
        &self,
        page: PageQuery,
    ) -> Result<Paginated<ValidProteomeId>, ApiError> {
        let req = self
            .http
            .get(self.url("/valid-proteome-ids"))
            .query(&page_params(page));
        decode_json(req.send().await?).await
    }

    /// Paginated list of clustering datasets available for submission
    pub async fn clustering_sets(
        &self,
        page: PageQuery,
    ) -> Result<Paginated<ClusteringSet>, ApiError> {
        let req = self
            .http
            .get(self.url("/clustering-sets"))
            .query(&page_params(page));
        decode_json(req.send().await?).await
    }

    /// Column metadata, optionally filtered by source file name
    pub async fn column_descriptions(
        &self,
        file_name: Option<&str>,
    ) -> Result<Vec<ColumnDescription>, ApiError> {
        let mut req = self.http.get(self.url("/column-descriptions"));
        if let Some(name) = file_name {
            req = req.query(&[("file_name", name)]);
        }
        decode_json(req.send().await?).await
    }

    pub async fn run_summary(&self, session_id: &str) -> Result<RunSummary, ApiError> {
        self.session_json(session_id, "/run-summary", &[]).await
    }

    pub async fn available_attributes_taxonsets(
        &self,
        session_id: &str,
    ) -> Result<AttributesTaxonsets, ApiError> {
        self.session_json(session_id, "/available-attributes-taxonsets", &[])
            .await
    }

    pub async fn counts_by_taxon(&self, session_id: &str) -> Result<TableRow, ApiError> {
        self.session_json(session_id, "/counts-by-taxon", &[]).await
    }

    /// Paginated per-cluster summary for one attribute
    pub async fn cluster_summary(
        &self,
        session_id: &str,
        attribute: &str,
        page: PageQuery,
        codes: &[String],
    ) -> Result<Paginated<TableRow>, ApiError> {
        let path = format!("/cluster-summary/{attribute}");
        let params = table_params(page, "CS_code", codes);
        self.session_json(session_id, &path, &params).await
    }

    /// Paginated per-attribute summary
    pub async fn attribute_summary(
        &self,
        session_id: &str,
        attribute: &str,
        page: PageQuery,
        codes: &[String],
    ) -> Result<Paginated<TableRow>, ApiError> {
        let path = format!("/attribute-summary/{attribute}");
        let params = table_params(page, "AS_code", codes);
        self.session_json(session_id, &path, &params).await
    }

    /// Paginated cluster metrics for one attribute/taxon-set pair
    pub async fn cluster_metrics(
        &self,
        session_id: &str,
        attribute: &str,
        taxon_set: &str,
        page: PageQuery,
        codes: &[String],
    ) -> Result<Paginated<TableRow>, ApiError> {
        let path = format!("/cluster-metrics/{attribute}/{taxon_set}");
        let params = table_params(page, "CM_code", codes);
        self.session_json(session_id, &path, &params).await
    }

    pub async fn pairwise_analysis(
        &self,
        session_id: &str,
        attribute: &str,
    ) -> Result<PairwiseAnalysis, ApiError> {
        let path = format!("/pairwise-analysis/{attribute}");
        self.session_json(session_id, &path, &[]).await
    }

    /// Per-cluster summary as a downloadable file (`as_file=true`)
    pub async fn cluster_summary_file(
        &self,
        session_id: &str,
        attribute: &str,
        codes: &[String],
    ) -> Result<Bytes, ApiError> {
        let path = format!("/cluster-summary/{attribute}");
        self.session_file(session_id, &path, "CS_code", codes).await
    }

    /// Per-attribute summary as a downloadable file
    pub async fn attribute_summary_file(
        &self,
        session_id: &str,
        attribute: &str,
        codes: &[String],
    ) -> Result<Bytes, ApiError> {
        let path = format!("/attribute-summary/{attribute}");
        self.session_file(session_id, &path, "AS_code", codes).await
    }

    /// Cluster metrics as a downloadable file
    pub async fn cluster_metrics_file(
        &self,
        session_id: &str,
        attribute: &str,
        taxon_set: &str,
        codes: &[String],
    ) -> Result<Bytes, ApiError> {
        let path = format!("/cluster-metrics/{attribute}/{taxon_set}");
        self.session_file(session_id, &path, "CM_code", codes).await
    }

    async fn session_file(
        &self,
        session_id: &str,
        path: &str,
        codes_param: &str,
        codes: &[String],
    ) -> Result<Bytes, ApiError> {
        let req = self
            .http
            .get(self.url(path))
            .header(SESSION_HEADER, session_id)
            .query(&file_params(codes_param, codes));
        decode_bytes(req.send().await?).await
    }

    /// Binary plot image (rarefaction curve, cluster-size distribution, ...)
    pub async fn plot(&self, session_id: &str, plot_type: &str) -> Result<Bytes, ApiError> {
        let req = self
            .http
            .get(self.url(&format!("/plot/{plot_type}")))
            .header(SESSION_HEADER, session_id);
        decode_bytes(req.send().await?).await
    }

    async fn session_json<T: DeserializeOwned>(
        &self,
        session_id: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let mut req = self
            .http
            .get(self.url(path))
            .header(SESSION_HEADER, session_id);
        if !params.is_empty() {
            req = req.query(params);
        }
        decode_json(req.send().await?).await
    }
}

#[async_trait]
impl StatusProbe for ApiClient {
    async fn is_complete(&self, session_id: &str) -> Result<bool, ApiError> {
        self.status(session_id).await.map(|s| s.is_complete)
    }
}

fn page_params(page: PageQuery) -> Vec<(String, String)> {
    vec![
        ("page".into(), page.page.to_string()),
        ("size".into(), page.page_size.to_string()),
    ]
}

fn table_params(page: PageQuery, codes_param: &str, codes: &[String]) -> Vec<(String, String)> {
    let mut params = page_params(page);
    for code in codes {
        params.push((codes_param.to_string(), code.clone()));
    }
    params
}

/// File downloads drop pagination and ask for the whole table at once
fn file_params(codes_param: &str, codes: &[String]) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![("as_file".into(), "true".into())];
    for code in codes {
        params.push((codes_param.to_string(), code.clone()));
    }
    params
}

/// Validate HTTP status and envelope, yielding the payload
async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let envelope: Envelope<T> = check_http(response)?
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?;
    envelope.into_result()
}

async fn decode_bytes(response: Response) -> Result<Bytes, ApiError> {
    Ok(check_http(response)?.bytes().await?)
}

fn check_http(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status == StatusCode::GONE {
        // the server discards results after their expiry date
        return Err(ApiError::SessionExpired);
    }
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_params_carry_page_and_codes() {
        let page = PageQuery {
            page: 2,
            page_size: 25,
        };
        let codes = vec!["protein_count".to_string(), "mean_count".to_string()];
        let params = table_params(page, "CM_code", &codes);
        assert_eq!(
            params,
            vec![
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "25".to_string()),
                ("CM_code".to_string(), "protein_count".to_string()),
                ("CM_code".to_string(), "mean_count".to_string()),
            ]
        );
    }

    #[test]
    fn test_file_params_request_the_whole_table() {
        let codes = vec!["protein_count".to_string()];
        let params = file_params("CS_code", &codes);
        assert_eq!(params[0], ("as_file".to_string(), "true".to_string()));
        assert_eq!(
            params[1],
            ("CS_code".to_string(), "protein_count".to_string())
        );
        // no pagination keys on a file download
        assert!(params.iter().all(|(k, _)| k != "page" && k != "size"));
    }
}
