//! Matches an inventory against a feed.
//!
//! A package is reported only when its installed version string is, byte for
//! byte, one of the versions listed in the feed entry for its name. Versions
//! below a listed fix are not reported; no version ordering is applied.

use std::collections::HashMap;

use crate::feed::{Feed, FeedEntry};
use crate::model::{Inventory, Report, Vulnerability};

/// Produces one [`Vulnerability`] per (installed package, matching feed entry) pair.
///
/// The feed is indexed by package name once, so the cost is linear in the
/// number of packages plus the number of feed entries. Neither input is modified.
pub fn match_vulnerabilities(inventory: &Inventory, feed: &Feed) -> Report {
    let mut index: HashMap<&str, Vec<&FeedEntry>> = HashMap::with_capacity(feed.entries.len());
    for entry in &feed.entries {
        index.entry(entry.package_name.as_str()).or_default().push(entry);
    }

    let vulnerabilities = inventory
        .packages
        .iter()
        .flat_map(|package| {
            index
                .get(package.name.as_str())
                .into_iter()
                .flatten()
                .filter_map(move |entry| {
                    let cves = entry.fixes_by_version.get(&package.version)?;
                    Some(Vulnerability {
                        package_name: package.name.clone(),
                        installed_version: package.version.clone(),
                        cve_identifiers: cves.clone(),
                    })
                })
        })
        .collect();

    Report {
        feed_version: feed.version.clone(),
        vulnerabilities,
    }
}
