//! Alpine security feed (secdb).
//!
//! The feed for a release lists, per package, the versions that fixed each
//! CVE. It is published per `major.minor` release:
//!
//! ```text
//! https://secdb.alpinelinux.org/v3.18/main.json
//! ```
//!
//! ```json
//! {"packages": [{"pkg": {"name": "musl", "secfixes": {"1.2.3-r0": ["CVE-2022-1234"]}}}]}
//! ```

mod fetch;

pub use fetch::{FeedFetcher, FeedSource};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Fix records for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub package_name: String,
    /// Version string to the CVE identifiers fixed as of that version.
    pub fixes_by_version: HashMap<String, Vec<String>>,
}

/// All fix records of one release's feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// The `major.minor` release this feed belongs to.
    pub version: String,
    pub entries: Vec<FeedEntry>,
}

impl Feed {
    /// Parses a secdb JSON document.
    pub fn from_json(version: impl Into<String>, body: &[u8]) -> serde_json::Result<Self> {
        let document: SecDbDocument = serde_json::from_slice(body)?;
        let entries = document
            .packages
            .into_iter()
            .map(|p| FeedEntry {
                package_name: p.pkg.name,
                fixes_by_version: p.pkg.secfixes,
            })
            .collect();

        Ok(Self {
            version: version.into(),
            entries,
        })
    }
}

// Wire format of secdb; fields we do not use (apkurl, archs, ...) are ignored.
#[derive(Deserialize)]
struct SecDbDocument {
    packages: Vec<SecDbPackage>,
}

#[derive(Deserialize)]
struct SecDbPackage {
    pkg: SecDbPkg,
}

#[derive(Deserialize)]
struct SecDbPkg {
    name: String,
    #[serde(default)]
    secfixes: HashMap<String, Vec<String>>,
}

/// Reduces an OS version to the `major.minor` key the feed is published under.
///
/// Accepts `3.18.4`, `3.18`, `"3.18.4"`, `VERSION_ID=3.18.4` and pre-release
/// forms such as `3.19_alpha20230901`.
///
/// # Errors
///
/// Returns [`ScanError::UnsupportedOsVersion`] when no numeric major and minor
/// can be found, e.g. for an empty string or `edge`.
pub fn normalize_os_version(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let version = trimmed
        .strip_prefix("VERSION_ID=")
        .unwrap_or(trimmed)
        .trim()
        .trim_matches('"')
        .trim_start_matches('v');

    if let Ok(parsed) = semver::Version::parse(version) {
        return Ok(format!("{}.{}", parsed.major, parsed.minor));
    }

    let mut parts = version.split('.');
    let major = parts
        .next()
        .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
        .and_then(|p| p.parse::<u64>().ok());
    let minor = parts.next().and_then(leading_number);

    match (major, minor) {
        (Some(major), Some(minor)) => Ok(format!("{}.{}", major, minor)),
        _ => Err(ScanError::UnsupportedOsVersion(raw.to_string())),
    }
}

fn leading_number(part: &str) -> Option<u64> {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().ok()
}
