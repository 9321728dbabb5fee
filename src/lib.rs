//! Scan container images for installed Alpine packages and match them
//! against the Alpine security feed.
//!
//! The pipeline has two stages:
//!
//! 1. [`scanner`] walks each layer's tar stream, parses the apk package
//!    database and os-release file, and builds an [`Inventory`].
//! 2. [`feed`] fetches the secdb feed for the inventory's `major.minor`
//!    release and [`matcher`] reports installed versions listed as fix points.
//!
//! Layers come from a [`source::LayerSource`]: a registry or a `docker save`
//! archive. [`pipeline::Pipeline`] ties the stages together.

pub mod config;
pub mod error;
pub mod feed;
pub mod layer;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::ScanError;
pub use model::{Inventory, Package, Report, ScanResult, Vulnerability};
pub use scanner::ArchiveScanner;
