//! Track creation workflow.
//!
//! A new track is deduplicated by ISRC, enriched from the metadata provider,
//! and persisted together with its artists.

use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::models::{NewTrack, Track, IMAGE_URL_MAX_LEN, NAME_MAX_LEN};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::services::metadata::{MetadataProvider, TrackMetadata};

pub const DUPLICATE_ISRC: &str = "Track with this ISRC already exists";
pub const NOT_FOUND_UPSTREAM: &str = "Track not found in Spotify API";

/// Creates tracks from ISRC codes.
pub struct TrackService {
    db: Arc<Mutex<Connection>>,
    metadata: Option<Arc<dyn MetadataProvider>>,
}

impl TrackService {
    pub fn new(db: Arc<Mutex<Connection>>, metadata: Option<Arc<dyn MetadataProvider>>) -> Self {
        Self { db, metadata }
    }

    /// Create a new track wrapped in Arc for shared access.
    pub fn new_shared(
        db: Arc<Mutex<Connection>>,
        metadata: Option<Arc<dyn MetadataProvider>>,
    ) -> Arc<Self> {
        Arc::new(Self::new(db, metadata))
    }

    /// Registers the track identified by `isrc`.
    ///
    /// The track row is committed before its artists, which are committed
    /// together afterwards. The connection lock is held across both commits,
    /// so other requests never see a track without its artists; a crash
    /// between the two commits can still leave one behind.
    pub async fn create_track(&self, isrc: &str) -> Result<Track> {
        {
            let db = self.db.lock().await;
            if queries::track_exists(&db, isrc)? {
                return Err(AppError::Conflict(DUPLICATE_ISRC.to_string()));
            }
        }

        // The lock is released while waiting on the provider
        let provider = self
            .metadata
            .as_ref()
            .ok_or_else(|| AppError::Upstream("Metadata provider not configured".to_string()))?;

        let metadata = provider
            .fetch(isrc)
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_UPSTREAM.to_string()))?;

        let mut db = self.db.lock().await;
        let track_id = insert_track(&db, isrc, &metadata)?;
        insert_artists(&mut db, track_id, &metadata.artists)?;

        let track = queries::get_track(&db, track_id)?.ok_or_else(|| {
            AppError::Internal(format!("Track {} vanished after insert", track_id))
        })?;

        tracing::info!(
            track_id = track.id,
            isrc = %track.isrc,
            title = %track.title,
            artists = track.artists.len(),
            provider = provider.name(),
            "Track created"
        );

        Ok(track)
    }
}

/// First commit: the track row itself (autocommit).
fn insert_track(conn: &Connection, isrc: &str, metadata: &TrackMetadata) -> Result<i64> {
    let title = truncate_chars(&metadata.title, NAME_MAX_LEN);
    let image_url = metadata
        .image_url
        .as_deref()
        .map(|url| truncate_chars(url, IMAGE_URL_MAX_LEN));

    queries::insert_track(
        conn,
        &NewTrack {
            isrc,
            title,
            image_url,
        },
    )
    .map_err(|e| {
        let err = AppError::from(e);
        if err.is_unique_violation() {
            // Another request inserted the same ISRC after our existence check
            tracing::warn!(isrc = %isrc, "Lost ISRC insert race");
            AppError::Conflict(DUPLICATE_ISRC.to_string())
        } else {
            err
        }
    })
}

/// Second commit: all artists, in provider order.
fn insert_artists(conn: &mut Connection, track_id: i64, names: &[String]) -> Result<()> {
    let tx = conn.transaction()?;
    for name in names {
        queries::insert_artist(&tx, track_id, truncate_chars(name, NAME_MAX_LEN))?;
    }
    tx.commit()?;
    Ok(())
}

/// Truncates to at most `max` characters without splitting a code point.
fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
