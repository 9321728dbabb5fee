use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{normalize_os_version, Feed};
use crate::config::Config;
use crate::error::{Result, ScanError};

/// Anything that can supply the feed for an OS version.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Retrieves the feed for the release `os_version` belongs to.
    ///
    /// # Errors
    ///
    /// [`ScanError::UnsupportedOsVersion`] if `os_version` has no `major.minor`,
    /// [`ScanError::FeedUnavailable`] if the source cannot be reached or
    /// answers with a non-success status, [`ScanError::FeedMalformed`] if the
    /// body is not a secdb document.
    async fn fetch(&self, os_version: &str) -> Result<Feed>;
}

/// Fetches secdb feeds over HTTP. One request per call, no retry, no cache.
pub struct FeedFetcher {
    client: reqwest::Client,
    base_url: String,
    repository: String,
}

impl FeedFetcher {
    pub fn new() -> Self {
        let config = Config::default();
        Self::with_client(reqwest::Client::new(), config.feed_url, config.feed_repository)
    }

    /// Builds a fetcher from the feed settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScanError::FeedUnavailable {
                url: config.feed_url.clone(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self::with_client(
            client,
            config.feed_url.clone(),
            config.feed_repository.clone(),
        ))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            repository: repository.into(),
        }
    }

    /// Address of the feed for a normalized `major.minor` version.
    pub fn feed_url(&self, major_minor: &str) -> String {
        format!(
            "{}/v{}/{}.json",
            self.base_url.trim_end_matches('/'),
            major_minor,
            self.repository
        )
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, os_version: &str) -> Result<Feed> {
        let major_minor = normalize_os_version(os_version)?;
        let url = self.feed_url(&major_minor);
        info!(url = %url, "Fetching vulnerability feed");

        let unavailable = |reason: String| ScanError::FeedUnavailable {
            url: url.clone(),
            reason,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let feed = Feed::from_json(major_minor, &body).map_err(|e| ScanError::FeedMalformed {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        debug!(url = %url, entries = feed.entries.len(), "Parsed vulnerability feed");
        Ok(feed)
    }
}
