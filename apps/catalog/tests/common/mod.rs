//! Test infrastructure for catalog integration tests.
//!
//! Provides a `TestApp` wrapper around `axum_test::TestServer` backed by an
//! in-memory database and a scripted metadata provider.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use catalog::config::{Config, DatabaseConfig, ServerConfig};
use catalog::error::{AppError, Result};
use catalog::services::{MetadataProvider, TrackMetadata};
use catalog::{app, db, AppState};

/// What the fake provider answers for the next lookups.
#[derive(Debug, Clone)]
pub enum FakeLookup {
    /// Always this metadata, whatever the ISRC.
    Found(TrackMetadata),
    /// Title `Song <ISRC>` with these artists.
    PerIsrc(Vec<String>),
    /// No match upstream.
    Missing,
    /// Transport/auth failure upstream.
    Unavailable,
}

/// Metadata provider double that counts its calls.
pub struct FakeProvider {
    lookup: std::sync::Mutex<FakeLookup>,
    calls: AtomicUsize,
}

impl FakeProvider {
    pub fn new(lookup: FakeLookup) -> Self {
        Self {
            lookup: std::sync::Mutex::new(lookup),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, lookup: FakeLookup) {
        *self.lookup.lock().unwrap() = lookup;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch(&self, isrc: &str) -> Result<Option<TrackMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lookup = self.lookup.lock().unwrap().clone();
        match lookup {
            FakeLookup::Found(metadata) => Ok(Some(metadata)),
            FakeLookup::PerIsrc(artists) => Ok(Some(TrackMetadata {
                title: format!("Song {}", isrc),
                image_url: Some("https://fake.image/url".to_string()),
                artists,
            })),
            FakeLookup::Missing => Ok(None),
            FakeLookup::Unavailable => {
                Err(AppError::Upstream("fake provider is down".to_string()))
            }
        }
    }
}

/// Metadata used by default: two artists, fixed title.
pub fn fake_song() -> TrackMetadata {
    TrackMetadata {
        title: "Fake Song".to_string(),
        image_url: Some("https://fake.image/url".to_string()),
        artists: vec!["Fake Artist 1".to_string(), "Fake Artist 2".to_string()],
    }
}

/// Test application wrapper around axum_test::TestServer.
pub struct TestApp {
    server: TestServer,
    db: Arc<Mutex<Connection>>,
    provider: Arc<FakeProvider>,
}

impl TestApp {
    /// Create a test application whose provider returns [`fake_song`].
    pub async fn new() -> Self {
        Self::with_lookup(FakeLookup::Found(fake_song())).await
    }

    /// Create a test application with a scripted provider.
    pub async fn with_lookup(lookup: FakeLookup) -> Self {
        let provider = Arc::new(FakeProvider::new(lookup));
        let (server, db) = build(Some(provider.clone() as Arc<dyn MetadataProvider>));
        Self {
            server,
            db,
            provider,
        }
    }

    /// Get a reference to the test server.
    pub fn server(&self) -> &TestServer {
        &self.server
    }

    /// Get a reference to the database connection.
    pub fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    /// Get a reference to the fake metadata provider.
    pub fn provider(&self) -> &FakeProvider {
        &self.provider
    }

    /// POST /tracks and return the response.
    pub async fn create(&self, isrc: &str) -> axum_test::TestResponse {
        self.server
            .post("/tracks")
            .json(&serde_json::json!({ "isrc": isrc }))
            .await
    }
}

/// Build a test server around the given provider (or none).
pub fn build(
    provider: Option<Arc<dyn MetadataProvider>>,
) -> (TestServer, Arc<Mutex<Connection>>) {
    let conn = db::init_db_memory().expect("Failed to initialize test database");

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: Vec::new(),
        },
        database: DatabaseConfig {
            path: ":memory:".into(),
        },
        spotify: Default::default(),
    };

    let state = AppState::new(config, conn, provider);
    let db = Arc::clone(&state.db);

    let server = TestServer::new(app(state)).expect("Failed to create test server");
    (server, db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert!(app.db.lock().await.is_autocommit());
        assert_eq!(app.provider().calls(), 0);
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let app = TestApp::new().await;
        let response = app.server().get("/").await;

        response.assert_status_ok();
        response.assert_json(&serde_json::json!({
            "message": "Welcome to Music API"
        }));
    }

    #[tokio::test]
    async fn test_health_check_endpoint() {
        let app = TestApp::new().await;
        let response = app.server().get("/health").await;

        response.assert_status_ok();
        response.assert_json_contains(&serde_json::json!({
            "message": "Track catalog is running"
        }));
    }
}
