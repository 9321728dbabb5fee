//! Archive scanner.
//!
//! Walks each layer's tar stream, hands the apk package database and the
//! os-release file to their parsers, and folds the per-layer findings into a
//! single [`Inventory`].
//!
//! A layer that cannot be decompressed or read is skipped as a whole and
//! reported in [`ScanOutcome::skipped`]; the remaining layers are still
//! scanned.
//!
//! # Example
//!
//! ```
//! use apkscan::layer::Layer;
//! use apkscan::scanner::ArchiveScanner;
//!
//! let layers = vec![Layer::unavailable("sha256:0000", "blob missing")];
//! let outcome = ArchiveScanner::new().scan(&layers);
//!
//! assert!(outcome.inventory.packages.is_empty());
//! assert_eq!(outcome.skipped.len(), 1);
//! ```

mod walk;

pub use walk::{scan_layer, LayerFindings, MAX_ENTRY_SIZE};

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::{Result, ScanError};
use crate::layer::Layer;
use crate::model::{Inventory, SkippedLayer};

/// Inventory built from a set of layers, plus the layers that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub inventory: Inventory,
    pub skipped: Vec<SkippedLayer>,
}

impl ScanOutcome {
    /// Merges one layer's result. Each layer lands whole or not at all.
    fn absorb(&mut self, digest: &str, result: Result<LayerFindings>) {
        match result {
            Ok(findings) => {
                info!(
                    digest = %digest,
                    packages = findings.packages.len(),
                    os_release = findings.os_version.is_some(),
                    "Scanned layer"
                );
                self.inventory.merge(findings.packages, findings.os_version);
            }
            Err(e) => {
                warn!(digest = %digest, "Skipping layer: {}", e);
                self.skipped.push(SkippedLayer {
                    digest: digest.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Scans image layers for installed Alpine packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveScanner;

impl ArchiveScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scans layers one after another, in the order given.
    pub fn scan(&self, layers: &[Layer]) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        for layer in layers {
            outcome.absorb(&layer.digest, scan_layer(layer));
        }
        outcome
    }

    /// Scans every layer on the blocking pool at once.
    ///
    /// Results are merged in the order the layers were given, so the outcome
    /// is identical to [`scan`](Self::scan) regardless of which layer
    /// finishes first.
    pub async fn scan_concurrent(&self, layers: Vec<Layer>) -> ScanOutcome {
        let digests: Vec<String> = layers.iter().map(|l| l.digest.clone()).collect();

        let tasks = layers
            .into_iter()
            .map(|layer| tokio::task::spawn_blocking(move || scan_layer(&layer)));
        let results = join_all(tasks).await;

        let mut outcome = ScanOutcome::default();
        for (digest, joined) in digests.iter().zip(results) {
            let result = joined.unwrap_or_else(|e| {
                Err(ScanError::LayerUnavailable {
                    digest: digest.clone(),
                    reason: format!("scan task failed: {}", e),
                })
            });
            outcome.absorb(digest, result);
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Package;
    use crate::test_support::{gzip_layer, TarEntry};

    fn db_layer(digest: &str, db: &[u8]) -> Layer {
        Layer::from_blob(
            digest,
            gzip_layer(&[TarEntry::file("lib/apk/db/installed", db)]),
        )
    }

    fn os_layer(digest: &str, os_release: &[u8]) -> Layer {
        Layer::from_blob(
            digest,
            gzip_layer(&[TarEntry::file("etc/os-release", os_release)]),
        )
    }

    #[test]
    fn test_packages_and_os_version_from_different_layers() {
        let layers = vec![
            db_layer("sha256:1", b"P:musl\nV:1.2.3-r0\n"),
            os_layer("sha256:2", b"VERSION_ID=\"3.18.0\"\n"),
        ];
        let outcome = ArchiveScanner::new().scan(&layers);

        assert_eq!(outcome.inventory.packages, vec![Package::new("musl", "1.2.3-r0")]);
        assert_eq!(outcome.inventory.os_version, "3.18.0");
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_two_package_databases_are_concatenated() {
        let layers = vec![
            db_layer("sha256:1", b"P:musl\nV:1.2.3-r0\n\nP:zlib\nV:1.2.13-r1\n"),
            db_layer("sha256:2", b"P:musl\nV:1.2.3-r0\n\nP:zlib\nV:1.3-r2\n"),
        ];
        let outcome = ArchiveScanner::new().scan(&layers);

        assert_eq!(
            outcome.inventory.packages,
            vec![
                Package::new("musl", "1.2.3-r0"),
                Package::new("zlib", "1.2.13-r1"),
                Package::new("musl", "1.2.3-r0"),
                Package::new("zlib", "1.3-r2"),
            ]
        );
    }

    #[test]
    fn test_last_os_release_wins() {
        let layers = vec![
            os_layer("sha256:1", b"VERSION_ID=3.17.0\n"),
            os_layer("sha256:2", b"VERSION_ID=3.18.5\n"),
        ];
        let outcome = ArchiveScanner::new().scan(&layers);

        assert_eq!(outcome.inventory.os_version, "3.18.5");
    }

    #[test]
    fn test_unreadable_layer_is_skipped() {
        let layers = vec![
            db_layer("sha256:1", b"P:musl\nV:1.2.3-r0\n"),
            Layer::from_blob("sha256:bad", vec![b'x'; 1024]),
            Layer::unavailable("sha256:gone", "not in archive"),
            os_layer("sha256:2", b"VERSION_ID=3.18.0\n"),
        ];
        let outcome = ArchiveScanner::new().scan(&layers);

        assert_eq!(outcome.inventory.packages.len(), 1);
        assert_eq!(outcome.inventory.os_version, "3.18.0");
        let skipped: Vec<&str> = outcome.skipped.iter().map(|s| s.digest.as_str()).collect();
        assert_eq!(skipped, vec!["sha256:bad", "sha256:gone"]);
    }

    #[test]
    fn test_no_layers() {
        let outcome = ArchiveScanner::new().scan(&[]);
        assert_eq!(outcome, ScanOutcome::default());
    }

    #[tokio::test]
    async fn test_concurrent_scan_matches_sequential() {
        let layers = vec![
            db_layer("sha256:1", b"P:musl\nV:1.2.3-r0\n"),
            os_layer("sha256:2", b"VERSION_ID=3.17.0\n"),
            Layer::unavailable("sha256:gone", "not in archive"),
            db_layer("sha256:3", b"P:busybox\nV:1.35.0-r1\n"),
            os_layer("sha256:4", b"VERSION_ID=3.18.0\n"),
        ];
        let scanner = ArchiveScanner::new();

        let sequential = scanner.scan(&layers);
        let concurrent = scanner.scan_concurrent(layers).await;

        assert_eq!(concurrent, sequential);
        assert_eq!(concurrent.inventory.os_version, "3.18.0");
        assert_eq!(concurrent.inventory.packages.len(), 2);
    }
}
