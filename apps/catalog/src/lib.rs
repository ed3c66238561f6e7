//! Track Catalog Library
//!
//! HTTP catalog of tracks and their artists, enriched from Spotify on creation.
//! This library exposes modules for use in integration tests.

use axum::{
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

use crate::config::Config;
use crate::services::{MetadataProvider, TrackService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<Mutex<Connection>>,
    pub track_service: Arc<TrackService>,
}

impl AppState {
    /// Build the state, wiring the track service to the shared connection.
    pub fn new(
        config: Config,
        conn: Connection,
        metadata_provider: Option<Arc<dyn MetadataProvider>>,
    ) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let track_service = TrackService::new_shared(Arc::clone(&db), metadata_provider);
        Self {
            config: Arc::new(config),
            db,
            track_service,
        }
    }

    /// Get a reference to the track service.
    pub fn track_service(&self) -> &TrackService {
        &self.track_service
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

pub async fn root() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "Welcome to Music API".to_string(),
        version: None,
    })
}

pub async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "Track catalog is running".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
    })
}

/// Build the complete application router.
///
/// Shared by the binary and the integration tests.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(api::tracks::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Configure CORS from the allowed origins.
///
/// If no origins are configured, only same-origin requests are allowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() {
        return cors;
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}
