//! Deep-link query state
//!
//! The dashboard keeps its attribute/taxon-set filter and per-view
//! pagination in URL query parameters so a shared link reproduces the same
//! view. This module is the query-string side of that contract: a
//! [`ViewState`] round-trips through `(key, value)` pairs, unknown keys are
//! ignored, and missing keys fall back to defaults.

use serde::{Deserialize, Serialize};

/// Sentinel selecting every attribute or taxon set
pub const ALL: &str = "all";

/// Currently selected attribute/taxon-set slice of the results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub attribute: String,
    pub taxonset: String,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            attribute: ALL.to_string(),
            taxonset: ALL.to_string(),
        }
    }
}

impl FilterSelection {
    pub fn is_all(&self) -> bool {
        self.attribute == ALL && self.taxonset == ALL
    }
}

/// Result views with their own pagination/column-selection params
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    AttributeSummary,
    ClusterMetrics,
    ClusterSummary,
}

impl View {
    /// Query-parameter prefix used for this view
    pub fn prefix(&self) -> &'static str {
        match self {
            View::AttributeSummary => "AS",
            View::ClusterMetrics => "CM",
            View::ClusterSummary => "CS",
        }
    }

    const ALL: [View; 3] = [View::AttributeSummary, View::ClusterMetrics, View::ClusterSummary];
}

/// Pagination and column selection for one view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    pub page: u32,
    pub page_size: u32,
    /// Selected column codes; empty means all columns
    pub codes: Vec<String>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            codes: Vec::new(),
        }
    }
}

/// Everything a deep link needs to reproduce a results view
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewState {
    pub filter: FilterSelection,
    pub attribute_summary: PageState,
    pub cluster_metrics: PageState,
    pub cluster_summary: PageState,
}

impl ViewState {
    pub fn page_state(&self, view: View) -> &PageState {
        match view {
            View::AttributeSummary => &self.attribute_summary,
            View::ClusterMetrics => &self.cluster_metrics,
            View::ClusterSummary => &self.cluster_summary,
        }
    }

    fn page_state_mut(&mut self, view: View) -> &mut PageState {
        match view {
            View::AttributeSummary => &mut self.attribute_summary,
            View::ClusterMetrics => &mut self.cluster_metrics,
            View::ClusterSummary => &mut self.cluster_summary,
        }
    }

    /// Serialize to query pairs, omitting values that equal the defaults
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if self.filter.attribute != ALL {
            pairs.push(("attribute".to_string(), self.filter.attribute.clone()));
        }
        if self.filter.taxonset != ALL {
            pairs.push(("taxonset".to_string(), self.filter.taxonset.clone()));
        }
        for view in View::ALL {
            let state = self.page_state(view);
            let defaults = PageState::default();
            let prefix = view.prefix();
            if state.page != defaults.page {
                pairs.push((format!("{prefix}_page"), state.page.to_string()));
            }
            if state.page_size != defaults.page_size {
                pairs.push((format!("{prefix}_pageSize"), state.page_size.to_string()));
            }
            for code in &state.codes {
                pairs.push((format!("{prefix}_code"), code.clone()));
            }
        }
        pairs
    }

    /// Rebuild a view state from query pairs; unknown keys are ignored and
    /// unparsable numbers keep their defaults
    pub fn from_query_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut state = ViewState::default();
        for (key, value) in pairs {
            match key {
                "attribute" => state.filter.attribute = value.to_string(),
                "taxonset" => state.filter.taxonset = value.to_string(),
                _ => {
                    let Some((prefix, field)) = key.split_once('_') else {
                        continue;
                    };
                    let Some(view) = View::ALL.iter().find(|v| v.prefix() == prefix) else {
                        continue;
                    };
                    let page_state = state.page_state_mut(*view);
                    match field {
                        "page" => {
                            if let Ok(page) = value.parse() {
                                page_state.page = page;
                            }
                        }
                        "pageSize" => {
                            if let Ok(size) = value.parse() {
                                page_state.page_size = size;
                            }
                        }
                        "code" => page_state.codes.push(value.to_string()),
                        _ => {}
                    }
                }
            }
        }
        state
    }
}
