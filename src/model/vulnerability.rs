use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Inventory, SkippedLayer};

/// An installed package whose exact version appears in a feed fix record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub package_name: String,
    pub installed_version: String,
    pub cve_identifiers: Vec<String>,
}

/// Vulnerabilities found for one inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// The `major.minor` feed the inventory was matched against.
    pub feed_version: String,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl Report {
    pub fn cve_count(&self) -> usize {
        self.vulnerabilities
            .iter()
            .map(|v| v.cve_identifiers.len())
            .sum()
    }
}

/// Everything known about one image after a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub image: String,
    pub scan_time: DateTime<Utc>,
    pub inventory: Inventory,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped_layers: Vec<SkippedLayer>,
    /// Absent when the vulnerability check was skipped or the feed failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

impl ScanResult {
    pub fn new(image: impl Into<String>, inventory: Inventory, skipped_layers: Vec<SkippedLayer>) -> Self {
        Self {
            image: image.into(),
            scan_time: Utc::now(),
            inventory,
            skipped_layers,
            report: None,
        }
    }

    pub fn with_report(mut self, report: Report) -> Self {
        self.report = Some(report);
        self
    }

    pub fn has_vulnerabilities(&self) -> bool {
        self.report
            .as_ref()
            .is_some_and(|r| !r.vulnerabilities.is_empty())
    }
}
