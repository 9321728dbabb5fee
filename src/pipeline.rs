//! End-to-end orchestration: layers → inventory → feed → report.
//!
//! The pipeline never exits the process. Failures come back as
//! [`ScanError`](crate::ScanError) values and the caller decides what to do,
//! e.g. print a scan-only result when the feed is unavailable.
//!
//! # Example
//!
//! ```no_run
//! use apkscan::pipeline::Pipeline;
//! use apkscan::source::RegistrySource;
//! use apkscan::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = Pipeline::from_config(&Config::default())?;
//!     let mut source = RegistrySource::new("alpine:3.18")?;
//!
//!     let scan = pipeline.scan(&mut source).await?;
//!     let report = pipeline.assess(&scan.inventory).await?;
//!     println!("{} vulnerable packages", report.vulnerabilities.len());
//!     Ok(())
//! }
//! ```

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::feed::{FeedFetcher, FeedSource};
use crate::matcher::match_vulnerabilities;
use crate::model::{Inventory, Report};
use crate::scanner::{ArchiveScanner, ScanOutcome};
use crate::source::LayerSource;

/// Runs the scan and match stages with one feed source.
pub struct Pipeline {
    scanner: ArchiveScanner,
    feed: Box<dyn FeedSource>,
    parallel_layers: bool,
}

impl Pipeline {
    pub fn new(feed: Box<dyn FeedSource>, parallel_layers: bool) -> Self {
        Self {
            scanner: ArchiveScanner::new(),
            feed,
            parallel_layers,
        }
    }

    /// Builds a pipeline fetching feeds over HTTP as configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = FeedFetcher::from_config(config)?;
        Ok(Self::new(Box::new(fetcher), config.parallel_layers))
    }

    /// Retrieves the image's layers and builds its inventory.
    ///
    /// # Errors
    ///
    /// Only image-level failures ([`crate::ScanError::ReferenceInvalid`],
    /// [`crate::ScanError::ImageUnavailable`]) are returned. Unreadable layers
    /// are listed in [`ScanOutcome::skipped`].
    pub async fn scan(&self, source: &mut dyn LayerSource) -> Result<ScanOutcome> {
        let layers = source.layers().await?;
        info!(image = %source.image(), layers = layers.len(), "Scanning image layers");

        let outcome = if self.parallel_layers && layers.len() > 1 {
            self.scanner.scan_concurrent(layers).await
        } else {
            self.scanner.scan(&layers)
        };

        info!(
            packages = outcome.inventory.packages.len(),
            os_version = %outcome.inventory.os_version,
            skipped = outcome.skipped.len(),
            "Inventory complete"
        );
        Ok(outcome)
    }

    /// Fetches the feed for the inventory's OS version and matches against it.
    ///
    /// # Errors
    ///
    /// Returns the feed stage's error; see [`FeedSource::fetch`].
    pub async fn assess(&self, inventory: &Inventory) -> Result<Report> {
        let feed = self.feed.fetch(&inventory.os_version).await?;
        let report = match_vulnerabilities(inventory, &feed);

        info!(
            feed_version = %report.feed_version,
            vulnerable = report.vulnerabilities.len(),
            cves = report.cve_count(),
            "Matched inventory against feed"
        );
        Ok(report)
    }
}
