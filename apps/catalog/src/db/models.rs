use serde::{Deserialize, Serialize};

/// Maximum ISRC length accepted at creation.
pub const ISRC_MAX_LEN: usize = 20;
/// Maximum length of track titles and artist names.
pub const NAME_MAX_LEN: usize = 255;
/// Maximum length of a cover image URL.
pub const IMAGE_URL_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub isrc: String,
    pub title: String,
    pub image_url: Option<String>,
    pub artists: Vec<Artist>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub track_id: i64,
}

/// Fields of a track row before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct NewTrack<'a> {
    pub isrc: &'a str,
    pub title: &'a str,
    pub image_url: Option<&'a str>,
}
