//! Layer sources.
//!
//! A [`LayerSource`] resolves one image to its ordered list of layer blobs.
//! Registry authentication, manifests and download all stay behind this
//! trait; the scanner only sees [`Layer`]s.
//!
//! | Source | Image argument |
//! |--------|----------------|
//! | [`RegistrySource`] | `alpine:3.18`, `ghcr.io/org/app@sha256:...` |
//! | [`ArchiveSource`] | path to a `docker save` tarball |

mod archive;
mod registry;

pub use archive::ArchiveSource;
pub use registry::{parse_reference, RegistrySource};

use async_trait::async_trait;

use crate::error::Result;
use crate::layer::Layer;

/// Supplies the layers of one resolved image, bottom layer first.
#[async_trait]
pub trait LayerSource: Send {
    /// Human-readable name of the image this source resolves.
    fn image(&self) -> &str;

    /// Retrieves every layer listed by the image's manifest, in manifest order.
    ///
    /// A layer that is listed but cannot be retrieved is returned as
    /// [`Layer::unavailable`] rather than failing the whole image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScanError::ImageUnavailable`] if the image or its
    /// manifest cannot be retrieved.
    async fn layers(&mut self) -> Result<Vec<Layer>>;
}
