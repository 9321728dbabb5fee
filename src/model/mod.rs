//! Core data types for packages, inventories, and vulnerability reports.
//!
//! - [`Package`] - An installed Alpine package
//! - [`Inventory`] - All packages found across an image's layers, plus its OS version
//! - [`SkippedLayer`] - A layer that could not be read
//! - [`Vulnerability`] - An installed package matched against a feed fix record
//! - [`Report`] - All vulnerabilities found for an inventory
//! - [`ScanResult`] - Complete scan results for one image
//!
//! # Example
//!
//! ```
//! use apkscan::{Inventory, Package};
//!
//! let mut inventory = Inventory::default();
//! inventory.packages.push(Package::new("musl", "1.2.3-r0"));
//! inventory.os_version = "3.18.0".to_string();
//!
//! println!("Found {} packages", inventory.packages.len());
//! ```

mod package;
mod vulnerability;

pub use package::*;
pub use vulnerability::*;
