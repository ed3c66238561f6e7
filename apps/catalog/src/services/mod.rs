//! Application services for the catalog service.

pub mod metadata;
pub mod spotify;
pub mod tracks;

pub use metadata::{MetadataProvider, TrackMetadata};
pub use spotify::SpotifyClient;
pub use tracks::TrackService;
