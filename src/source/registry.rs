use async_trait::async_trait;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::manifest::ImageIndexEntry;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::Reference;
use tracing::{debug, info, warn};

use super::LayerSource;
use crate::error::{Result, ScanError};
use crate::layer::Layer;

/// Pulls an image's layers from an OCI registry with anonymous access.
pub struct RegistrySource {
    image: String,
    reference: Reference,
    client: Client,
}

impl RegistrySource {
    /// Creates a source for `image`, e.g. `alpine:3.18` or `ghcr.io/org/app:v1`.
    ///
    /// Registries on `localhost` or `127.0.0.1` (with or without a port) are
    /// reached over plain HTTP; everything else uses HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ReferenceInvalid`] if `image` is not a valid reference.
    pub fn new(image: &str) -> Result<Self> {
        let reference = parse_reference(image)?;

        let config = ClientConfig {
            protocol: ClientProtocol::HttpsExcept(plain_http_registries(&reference)),
            platform_resolver: Some(Box::new(linux_platform_resolver)),
            ..Default::default()
        };

        Ok(Self {
            image: image.to_string(),
            reference,
            client: Client::new(config),
        })
    }
}

#[async_trait]
impl LayerSource for RegistrySource {
    fn image(&self) -> &str {
        &self.image
    }

    async fn layers(&mut self) -> Result<Vec<Layer>> {
        info!(image = %self.image, reference = %self.reference.whole(), "Pulling image manifest");

        let (manifest, manifest_digest) = self
            .client
            .pull_image_manifest(&self.reference, &RegistryAuth::Anonymous)
            .await
            .map_err(|e| ScanError::ImageUnavailable {
                image: self.image.clone(),
                reason: e.to_string(),
            })?;

        info!(
            image = %self.image,
            manifest = %manifest_digest,
            layers = manifest.layers.len(),
            "Resolved image manifest"
        );

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for descriptor in &manifest.layers {
            let mut blob = Vec::new();
            match self
                .client
                .pull_blob(&self.reference, descriptor, &mut blob)
                .await
            {
                Ok(()) => {
                    debug!(digest = %descriptor.digest, bytes = blob.len(), "Fetched layer blob");
                    layers.push(Layer::from_blob(descriptor.digest.clone(), blob));
                }
                Err(e) => {
                    warn!(
                        image = %self.image,
                        digest = %descriptor.digest,
                        media_type = %descriptor.media_type,
                        error = %e,
                        "Layer blob could not be fetched"
                    );
                    layers.push(Layer::unavailable(descriptor.digest.clone(), e.to_string()));
                }
            }
        }

        Ok(layers)
    }
}

/// Loopback registries, port included, since the client matches the exact
/// registry string.
fn plain_http_registries(reference: &Reference) -> Vec<String> {
    let mut registries = vec!["localhost".to_string(), "127.0.0.1".to_string()];

    let registry = reference.resolve_registry();
    let host = registry.split(':').next().unwrap_or_default();
    if (host == "localhost" || host == "127.0.0.1") && !registries.iter().any(|r| r == registry) {
        registries.push(registry.to_string());
    }

    registries
}

/// Parses an image name into a registry reference.
///
/// Handles:
/// - Short names: `alpine` → `docker.io/library/alpine:latest`
/// - User repositories: `user/app:1.0` → `docker.io/user/app:1.0`
/// - Fully qualified: `ghcr.io/org/repo:tag`
/// - Local registries: `localhost:5000/app` (pulled over plain HTTP)
/// - Digests: `alpine@sha256:...`
pub fn parse_reference(image: &str) -> Result<Reference> {
    let invalid = |reason: String| ScanError::ReferenceInvalid {
        reference: image.to_string(),
        reason,
    };

    let image = image.trim();
    if image.is_empty() {
        return Err(invalid("empty image reference".to_string()));
    }

    let first = image.split('/').next().unwrap_or_default();
    let has_registry = image.contains('/')
        && (first.contains('.') || first.contains(':') || first == "localhost");

    let normalized = if has_registry {
        image.to_string()
    } else if image.contains('/') {
        format!("docker.io/{}", image)
    } else {
        format!("docker.io/library/{}", image)
    };

    // Only the last path component can carry a tag; a colon before it is a port.
    let last = normalized.rsplit('/').next().unwrap_or_default();
    let normalized = if last.contains(':') || normalized.contains('@') {
        normalized
    } else {
        format!("{}:latest", normalized)
    };

    debug!(image, normalized = %normalized, "Parsed image reference");
    Reference::try_from(normalized.as_str()).map_err(|e| invalid(e.to_string()))
}

/// Selects the linux image for the host architecture from a multi-platform index.
fn linux_platform_resolver(manifests: &[ImageIndexEntry]) -> Option<String> {
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    };

    debug!("Looking for linux/{} image variant", arch);

    manifests
        .iter()
        .find(|entry| {
            entry
                .platform
                .as_ref()
                .is_some_and(|platform| platform.os == "linux" && platform.architecture == arch)
        })
        .map(|entry| entry.digest.clone())
}
