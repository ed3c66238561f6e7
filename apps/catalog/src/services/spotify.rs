//! Spotify Web API client.
//!
//! Resolves ISRC codes to track metadata using the client-credentials flow.
//! A fresh access token is requested for every lookup.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SpotifyConfig;
use crate::error::{AppError, Result};
use crate::services::metadata::{MetadataProvider, TrackMetadata};

/// Spotify API client for looking up tracks by ISRC.
pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    api_base_url: String,
}

impl SpotifyClient {
    /// Create a new Spotify client from configuration.
    ///
    /// Returns an error if credentials are missing or if the HTTP client cannot be built.
    pub fn new(config: &SpotifyConfig) -> Result<Self> {
        let (client_id, client_secret) = config.credentials().ok_or_else(|| {
            AppError::Internal("Spotify client id and secret are required".to_string())
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url: config.token_url.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new Spotify client wrapped in Arc for shared access.
    pub fn new_shared(config: &SpotifyConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(config)?))
    }

    /// Exchange the client credentials for a bearer token.
    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Spotify token request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(AppError::Upstream(
                "Spotify rejected the client credentials".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Spotify token endpoint returned error status: {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::Upstream(format!("Failed to parse Spotify token response: {}", e))
        })?;

        Ok(token.access_token)
    }

    /// Search tracks matching an ISRC.
    pub async fn search_isrc(&self, isrc: &str) -> Result<Vec<SpotifyTrack>> {
        tracing::debug!(isrc = %isrc, "Searching Spotify by ISRC");

        let token = self.access_token().await?;
        let url = format!("{}/search", self.api_base_url);
        let query = format!("isrc:{}", isrc);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("type", "track")])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Spotify search request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Upstream(
                "Spotify rate limit exceeded, please try again later".to_string(),
            ));
        }

        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Spotify search returned error status: {}",
                status
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            AppError::Upstream(format!("Failed to parse Spotify search response: {}", e))
        })?;

        Ok(body.tracks.items)
    }
}

#[async_trait]
impl MetadataProvider for SpotifyClient {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn fetch(&self, isrc: &str) -> Result<Option<TrackMetadata>> {
        let candidates = self.search_isrc(isrc).await?;
        tracing::debug!(isrc = %isrc, candidates = candidates.len(), "Spotify search complete");
        Ok(most_popular(candidates).map(TrackMetadata::from))
    }
}

/// Picks the candidate with the highest popularity; the first one wins ties.
pub fn most_popular(candidates: Vec<SpotifyTrack>) -> Option<SpotifyTrack> {
    candidates
        .into_iter()
        .fold(None, |best: Option<SpotifyTrack>, candidate| match best {
            Some(current) if current.popularity >= candidate.popularity => Some(current),
            _ => Some(candidate),
        })
}

impl From<SpotifyTrack> for TrackMetadata {
    fn from(track: SpotifyTrack) -> Self {
        TrackMetadata {
            title: track.name,
            image_url: track.album.images.into_iter().next().map(|image| image.url),
            artists: track.artists.into_iter().map(|artist| artist.name).collect(),
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchPage,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

/// Track object from Spotify search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,
    #[serde(default)]
    pub popularity: u32,
    pub album: SpotifyAlbum,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

/// Album summary attached to a track.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

/// Album artwork entry, largest first.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

/// Artist summary attached to a track.
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}
