//! Entry-by-entry walk over a single layer's tar stream.

use std::io::Read;
use std::path::Path;

use tar::EntryType;
use tracing::{debug, warn};

use crate::error::Result;
use crate::layer::Layer;
use crate::model::Package;
use crate::parser::{parse_installed, parse_os_release, INSTALLED_DB_PATH, OS_RELEASE_PATH};

/// Entries larger than this are skipped rather than buffered.
pub const MAX_ENTRY_SIZE: u64 = 64 * 1024 * 1024;

/// Where `etc/os-release` points on releases that ship it as a symlink.
const USR_OS_RELEASE_PATH: &str = "usr/lib/os-release";

/// What one layer contributed to the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerFindings {
    pub packages: Vec<Package>,
    /// Set only when the layer carried an os-release file.
    pub os_version: Option<String>,
}

/// Walks every entry of a layer in stream order.
///
/// Only the package database and os-release entries are read into memory;
/// everything else is skipped as the stream advances. When `etc/os-release`
/// is a symlink to `usr/lib/os-release` the target in the same layer is read.
///
/// # Errors
///
/// Returns [`crate::ScanError::LayerUnavailable`] when the stream cannot be
/// decompressed, an entry header is corrupt, or a matched entry cannot be read.
/// Findings gathered before the failure are discarded.
pub fn scan_layer(layer: &Layer) -> Result<LayerFindings> {
    let mut archive = layer.open()?;
    let entries = archive
        .entries()
        .map_err(|e| layer.unavailable_error(format!("tar stream: {}", e)))?;

    let mut findings = LayerFindings::default();
    let mut os_release_is_link = false;
    let mut usr_os_release: Option<String> = None;

    for entry in entries {
        let mut entry = entry.map_err(|e| layer.unavailable_error(format!("tar entry: {}", e)))?;

        let path = match entry.path() {
            Ok(path) => normalize_entry_path(&path),
            Err(e) => {
                debug!(digest = %layer.digest, "Skipping entry with unreadable path: {}", e);
                continue;
            }
        };

        let wanted = path == INSTALLED_DB_PATH
            || path == OS_RELEASE_PATH
            || path == USR_OS_RELEASE_PATH;
        if !wanted {
            continue;
        }

        let entry_type = entry.header().entry_type();
        if entry_type == EntryType::Symlink && path == OS_RELEASE_PATH {
            let target = entry.link_name().ok().flatten().map(|t| resolve_link(&t));
            os_release_is_link = target.as_deref() == Some(USR_OS_RELEASE_PATH);
            debug!(digest = %layer.digest, target = ?target, "os-release is a symlink");
            continue;
        }
        if !entry_type.is_file() {
            continue;
        }

        let size = entry.header().size().unwrap_or(0);
        if size > MAX_ENTRY_SIZE {
            warn!(digest = %layer.digest, path = %path, size, "Skipping oversized entry");
            continue;
        }

        let mut payload = Vec::with_capacity(size as usize);
        entry
            .read_to_end(&mut payload)
            .map_err(|e| layer.unavailable_error(format!("reading {}: {}", path, e)))?;

        match path.as_str() {
            INSTALLED_DB_PATH => {
                let packages = parse_installed(&payload);
                debug!(digest = %layer.digest, count = packages.len(), "Parsed package database");
                findings.packages.extend(packages);
            }
            OS_RELEASE_PATH => {
                os_release_is_link = false;
                findings.os_version = Some(parse_os_release(&payload));
            }
            _ => usr_os_release = Some(parse_os_release(&payload)),
        }
    }

    if os_release_is_link {
        if let Some(version) = usr_os_release {
            findings.os_version = Some(version);
        }
    }

    Ok(findings)
}

/// Strips a leading `./` or `/` so both archive path styles compare equal.
fn normalize_entry_path(path: &Path) -> String {
    let path = path.to_string_lossy();
    path.trim_start_matches("./").trim_start_matches('/').to_string()
}

/// Resolves a symlink target found at `etc/os-release` to a layer path.
fn resolve_link(target: &Path) -> String {
    let target = target.to_string_lossy();
    match target.strip_prefix("../") {
        Some(relative) => relative.to_string(),
        None => target.trim_start_matches('/').to_string(),
    }
}
