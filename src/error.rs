//! Error types for the scan pipeline.
//!
//! [`ScanError`] covers every failure the library surfaces to its caller.
//! Parse problems inside the package database and os-release files are not
//! errors: those parsers degrade to fewer records instead.

/// Failures raised while resolving an image, reading its layers, or
/// retrieving the vulnerability feed.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The image reference could not be parsed.
    #[error("invalid image reference '{reference}': {reason}")]
    ReferenceInvalid { reference: String, reason: String },

    /// The image or its manifest could not be retrieved.
    #[error("image unavailable '{image}': {reason}")]
    ImageUnavailable { image: String, reason: String },

    /// A single layer could not be retrieved or decompressed.
    #[error("layer unavailable {digest}: {reason}")]
    LayerUnavailable { digest: String, reason: String },

    /// The OS version could not be reduced to `major.minor`.
    #[error("unsupported OS version '{0}'")]
    UnsupportedOsVersion(String),

    /// The feed source answered with a non-success status or could not be reached.
    #[error("vulnerability feed unavailable at {url}: {reason}")]
    FeedUnavailable { url: String, reason: String },

    /// The feed body was not the expected JSON document.
    #[error("vulnerability feed malformed at {url}: {reason}")]
    FeedMalformed { url: String, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("config error: {path}: {reason}")]
    Config { path: String, reason: String },
}

impl ScanError {
    /// Returns true for failures of the feed stage, after the scan itself succeeded.
    pub fn is_feed_error(&self) -> bool {
        matches!(
            self,
            ScanError::FeedUnavailable { .. }
                | ScanError::FeedMalformed { .. }
                | ScanError::UnsupportedOsVersion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
