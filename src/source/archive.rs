use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tar::Archive;
use tracing::{debug, info, warn};

use super::LayerSource;
use crate::error::{Result, ScanError};
use crate::layer::Layer;

const MANIFEST_PATH: &str = "manifest.json";

/// Reads an image saved with `docker save` (or `podman save`) from disk.
pub struct ArchiveSource {
    image: String,
    path: PathBuf,
    manifest: ArchiveManifest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ArchiveManifest {
    #[serde(default)]
    repo_tags: Vec<String>,
    layers: Vec<String>,
}

impl ArchiveSource {
    /// Opens the archive at `path` and reads its `manifest.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ImageUnavailable`] if the file cannot be read or
    /// has no usable manifest.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let image = path.display().to_string();
        let unavailable = |reason: String| ScanError::ImageUnavailable {
            image: image.clone(),
            reason,
        };

        let mut manifest_bytes = None;
        for_each_entry(&path, |entry_path, entry| {
            if entry_path == MANIFEST_PATH {
                let mut contents = Vec::new();
                entry.read_to_end(&mut contents)?;
                manifest_bytes = Some(contents);
            }
            Ok(())
        })
        .map_err(|e| unavailable(e.to_string()))?;

        let manifest_bytes =
            manifest_bytes.ok_or_else(|| unavailable(format!("no {} in archive", MANIFEST_PATH)))?;
        let manifests: Vec<ArchiveManifest> = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| unavailable(format!("invalid {}: {}", MANIFEST_PATH, e)))?;
        let manifest = manifests
            .into_iter()
            .next()
            .ok_or_else(|| unavailable(format!("empty {}", MANIFEST_PATH)))?;

        debug!(archive = %image, tags = ?manifest.repo_tags, layers = manifest.layers.len(), "Read archive manifest");

        Ok(Self {
            image,
            path,
            manifest,
        })
    }
}

#[async_trait]
impl LayerSource for ArchiveSource {
    fn image(&self) -> &str {
        self.manifest
            .repo_tags
            .first()
            .map(String::as_str)
            .unwrap_or(self.image.as_str())
    }

    async fn layers(&mut self) -> Result<Vec<Layer>> {
        info!(archive = %self.path.display(), "Reading image archive");

        let mut blobs: HashMap<String, Vec<u8>> = HashMap::new();
        let wanted = &self.manifest.layers;
        for_each_entry(&self.path, |entry_path, entry| {
            if wanted.iter().any(|l| l == entry_path) {
                let mut blob = Vec::new();
                entry.read_to_end(&mut blob)?;
                blobs.insert(entry_path.to_string(), blob);
            }
            Ok(())
        })
        .map_err(|e| ScanError::ImageUnavailable {
            image: self.image.clone(),
            reason: e.to_string(),
        })?;

        let layers = self
            .manifest
            .layers
            .iter()
            .map(|layer_path| {
                let digest = layer_digest(layer_path);
                match blobs.get(layer_path).cloned() {
                    Some(blob) => Layer::from_blob(digest, blob),
                    None => {
                        warn!(layer = %layer_path, "Layer listed in manifest is missing from archive");
                        Layer::unavailable(digest, format!("{} missing from archive", layer_path))
                    }
                }
            })
            .collect();

        Ok(layers)
    }
}

/// Walks the outer archive once, calling `f` with each entry's normalized path.
fn for_each_entry<F>(path: &Path, mut f: F) -> std::io::Result<()>
where
    F: FnMut(&str, &mut tar::Entry<'_, File>) -> std::io::Result<()>,
{
    let file = File::open(path)?;
    let mut archive = Archive::new(file);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.to_string_lossy().to_string();
        let entry_path = entry_path.trim_start_matches("./");
        f(entry_path, &mut entry)?;
    }

    Ok(())
}

/// `blobs/sha256/<hex>` (OCI layout) becomes `sha256:<hex>`; legacy
/// `<id>/layer.tar` paths are kept as they are.
fn layer_digest(layer_path: &str) -> String {
    match layer_path.strip_prefix("blobs/") {
        Some(rest) => match rest.split_once('/') {
            Some((algorithm, hex)) => format!("{}:{}", algorithm, hex),
            None => layer_path.to_string(),
        },
        None => layer_path.to_string(),
    }
}
