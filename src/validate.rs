//! Configuration validation
//!
//! Checks a taxon-definition table before submission and accumulates every
//! problem into a structured report instead of stopping at the first one.
//! A failed report blocks submission; it never aborts the process.

use crate::session::TaxonRecord;
use anyhow::{bail, Result};
use std::collections::HashSet;
use std::fmt;

/// One problem found in a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// 1-based record number, or `None` for table-level problems
    pub row: Option<usize>,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "record {}: {}", row, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Accumulated validation result for one configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, row: Option<usize>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            row,
            message: message.into(),
        });
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Validate a taxon-definition table prior to submission
pub fn validate_config(records: &[TaxonRecord]) -> ValidationReport {
    let mut report = ValidationReport::default();

    if records.is_empty() {
        report.push(None, "configuration must contain at least one taxon record");
        return report;
    }

    let mut seen = HashSet::new();
    for (idx, record) in records.iter().enumerate() {
        let row = idx + 1;
        if record.taxon_id.trim().is_empty() {
            report.push(Some(row), "taxon id is empty");
        }
        if record.clade.trim().is_empty() {
            report.push(Some(row), "clade is empty");
        }
        if record.host_group.trim().is_empty() {
            report.push(Some(row), "host group is empty");
        }
        if !record.taxon_id.trim().is_empty() && !seen.insert(record.taxon_id.clone()) {
            report.push(
                Some(row),
                format!("duplicate taxon id '{}'", record.taxon_id),
            );
        }
    }

    report
}

/// Parse a taxon-definition table from text
///
/// Accepts tab- or comma-separated lines of `taxon_id, clade, host_group`.
/// Lines starting with `#` and a leading header line naming the columns are
/// skipped. Parsing is shape-only; field contents are checked separately by
/// [`validate_config`].
pub fn parse_taxon_table(content: &str) -> Result<Vec<TaxonRecord>> {
    let mut records = Vec::new();
    let mut seen_data = false;
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = if line.contains('\t') {
            line.split('\t').map(str::trim).collect()
        } else {
            line.split(',').map(str::trim).collect()
        };
        // a header is only recognized on the first non-comment line
        if !seen_data && is_header(&fields) {
            seen_data = true;
            continue;
        }
        seen_data = true;
        if fields.len() != 3 {
            bail!(
                "line {}: expected 3 fields (taxon_id, clade, host_group), found {}",
                lineno + 1,
                fields.len()
            );
        }
        records.push(TaxonRecord::new(fields[0], fields[1], fields[2]));
    }
    Ok(records)
}

fn is_header(fields: &[&str]) -> bool {
    fields
        .first()
        .map(|f| f.eq_ignore_ascii_case("taxon_id") || f.eq_ignore_ascii_case("taxon"))
        .unwrap_or(false)
}
