//! Metadata provider abstraction used to enrich new tracks.

use async_trait::async_trait;

use crate::error::Result;

/// Track details resolved from an external provider for an ISRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    pub title: String,
    pub image_url: Option<String>,
    /// Artist names in provider order.
    pub artists: Vec<String>,
}

/// A source of track metadata keyed by ISRC.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Resolve an ISRC to the best matching track.
    ///
    /// Returns `Ok(None)` when the provider has no match; transport or
    /// authentication failures are returned as errors.
    async fn fetch(&self, isrc: &str) -> Result<Option<TrackMetadata>>;
}
