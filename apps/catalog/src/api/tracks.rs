//! Track API endpoints: listing, creation, ISRC lookup and artist search.

use std::collections::BTreeSet;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::{Track, ISRC_MAX_LEN};
use crate::db::queries;
use crate::error::{AppError, Result};
use crate::AppState;

// =============================================================================
// Request Types
// =============================================================================

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Offset pagination shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    /// Number of tracks to skip (default: 0).
    pub skip: Option<i64>,
    /// Maximum number of tracks to return (1-100, default: 10).
    pub limit: Option<i64>,
}

impl PageParams {
    /// Returns `(skip, limit)` with defaults applied, rejecting out-of-range values.
    pub fn resolve(&self) -> Result<(i64, i64)> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);

        if skip < 0 {
            return Err(AppError::Validation(
                "skip must be greater than or equal to 0".to_string(),
            ));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }

        Ok((skip, limit))
    }
}

/// Request body for creating a track.
#[derive(Debug, Deserialize)]
pub struct CreateTrackRequest {
    pub isrc: String,
}

// =============================================================================
// Router
// =============================================================================

/// Create the tracks router.
///
/// Path parameters use `:name` syntax for compatibility with axum-test.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tracks", get(list_tracks).post(create_track))
        .route("/tracks/artist/:name", get(list_tracks_by_artist))
        .route("/tracks/:isrc", get(get_track_by_isrc))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /tracks
///
/// Lists tracks in insertion order.
pub async fn list_tracks(
    State(state): State<AppState>,
    query: std::result::Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Track>>> {
    let Query(page) = query?;
    let (skip, limit) = page.resolve()?;

    let db = state.db.lock().await;
    let tracks = queries::list_tracks(&db, skip, limit)?;

    Ok(Json(tracks))
}

/// POST /tracks
///
/// Creates a track from its ISRC, enriched with provider metadata.
pub async fn create_track(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateTrackRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Track>)> {
    let Json(body) = body?;

    // Stored exactly as sent; trimming only decides emptiness
    let isrc = body.isrc.as_str();
    if isrc.trim().is_empty() {
        return Err(AppError::Validation("isrc is required".to_string()));
    }
    if isrc.chars().count() > ISRC_MAX_LEN {
        return Err(AppError::Validation(format!(
            "isrc must be at most {} characters",
            ISRC_MAX_LEN
        )));
    }

    let track = state.track_service().create_track(isrc).await?;

    Ok((StatusCode::CREATED, Json(track)))
}

/// GET /tracks/:isrc
///
/// Gets a single track by exact ISRC.
pub async fn get_track_by_isrc(
    State(state): State<AppState>,
    Path(isrc): Path<String>,
) -> Result<Json<Track>> {
    let db = state.db.lock().await;

    let track = queries::find_track_by_isrc(&db, &isrc)?
        .ok_or_else(|| AppError::NotFound("Track not found".to_string()))?;

    Ok(Json(track))
}

/// GET /tracks/artist/:name
///
/// Lists tracks having an artist whose name contains `name`, ignoring case.
pub async fn list_tracks_by_artist(
    State(state): State<AppState>,
    Path(name): Path<String>,
    query: std::result::Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Track>>> {
    let Query(page) = query?;
    let (skip, limit) = page.resolve()?;

    let db = state.db.lock().await;

    let track_ids: Vec<i64> = queries::find_artists_by_name(&db, &name)?
        .into_iter()
        .map(|artist| artist.track_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if track_ids.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let tracks = queries::list_tracks_by_ids(&db, &track_ids, skip, limit)?;

    tracing::debug!(
        artist = %name,
        matched = track_ids.len(),
        returned = tracks.len(),
        "Artist search"
    );

    Ok(Json(tracks))
}
