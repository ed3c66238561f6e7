//! SQL queries over the `tracks` and `artists` tables.
//!
//! Every function borrows the caller's connection, so the caller decides how
//! statements are grouped into transactions.

use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::models::{Artist, NewTrack, Track};

const TRACK_COLUMNS: &str = "id, isrc, title, image_url";

/// Looks up a track by exact (case-sensitive) ISRC, with its artists.
pub fn find_track_by_isrc(conn: &Connection, isrc: &str) -> rusqlite::Result<Option<Track>> {
    let track = conn
        .query_row(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE isrc = ?1"),
            [isrc],
            map_track_row,
        )
        .optional()?;

    match track {
        Some(track) => {
            let mut tracks = vec![track];
            attach_artists(conn, &mut tracks)?;
            Ok(tracks.pop())
        }
        None => Ok(None),
    }
}

/// Returns true if a track with this ISRC is already stored.
pub fn track_exists(conn: &Connection, isrc: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tracks WHERE isrc = ?1)",
        [isrc],
        |row| row.get(0),
    )
}

/// Loads a single track by primary key, with its artists.
pub fn get_track(conn: &Connection, track_id: i64) -> rusqlite::Result<Option<Track>> {
    let track = conn
        .query_row(
            &format!("SELECT {TRACK_COLUMNS} FROM tracks WHERE id = ?1"),
            [track_id],
            map_track_row,
        )
        .optional()?;

    match track {
        Some(track) => {
            let mut tracks = vec![track];
            attach_artists(conn, &mut tracks)?;
            Ok(tracks.pop())
        }
        None => Ok(None),
    }
}

/// Finds artists whose name contains `fragment`, ignoring ASCII case.
///
/// Case folding is ASCII-only (SQLite `LIKE`): `BJÖRK` does not match "Björk".
/// `%`, `_` and `\` in the fragment match literally.
pub fn find_artists_by_name(conn: &Connection, fragment: &str) -> rusqlite::Result<Vec<Artist>> {
    let pattern = format!("%{}%", escape_like(fragment));
    let mut stmt = conn.prepare(
        r#"
        SELECT id, name, track_id FROM artists
        WHERE name LIKE ?1 ESCAPE '\'
        ORDER BY id
        "#,
    )?;

    let artists = stmt
        .query_map([pattern], map_artist_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(artists)
}

/// Inserts a track row and returns its generated id.
pub fn insert_track(conn: &Connection, track: &NewTrack<'_>) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO tracks (isrc, title, image_url) VALUES (?1, ?2, ?3)",
        params![track.isrc, track.title, track.image_url],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Inserts an artist bound to `track_id` and returns its generated id.
pub fn insert_artist(conn: &Connection, track_id: i64, name: &str) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO artists (name, track_id) VALUES (?1, ?2)",
        params![name, track_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Lists a page of tracks in insertion (primary key) order.
pub fn list_tracks(conn: &Connection, skip: i64, limit: i64) -> rusqlite::Result<Vec<Track>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRACK_COLUMNS} FROM tracks ORDER BY id LIMIT ?1 OFFSET ?2"
    ))?;

    let mut tracks = stmt
        .query_map(params![limit, skip], map_track_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    attach_artists(conn, &mut tracks)?;
    Ok(tracks)
}

/// Lists a page of the tracks whose ids are in `ids`, ordered by id.
pub fn list_tracks_by_ids(
    conn: &Connection,
    ids: &[i64],
    skip: i64,
    limit: i64,
) -> rusqlite::Result<Vec<Track>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT {TRACK_COLUMNS} FROM tracks WHERE id IN ({}) ORDER BY id LIMIT ? OFFSET ?",
        placeholders(ids.len())
    );
    let values = ids.iter().copied().chain([limit, skip]);

    let mut stmt = conn.prepare(&sql)?;
    let mut tracks = stmt
        .query_map(params_from_iter(values), map_track_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    attach_artists(conn, &mut tracks)?;
    Ok(tracks)
}

/// Fills in `artists` for each track, in artist insertion order.
fn attach_artists(conn: &Connection, tracks: &mut [Track]) -> rusqlite::Result<()> {
    if tracks.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "SELECT id, name, track_id FROM artists WHERE track_id IN ({}) ORDER BY id",
        placeholders(tracks.len())
    );
    let mut stmt = conn.prepare(&sql)?;

    let mut by_track: HashMap<i64, Vec<Artist>> = HashMap::new();
    let rows = stmt.query_map(params_from_iter(tracks.iter().map(|t| t.id)), map_artist_row)?;
    for artist in rows {
        let artist = artist?;
        by_track.entry(artist.track_id).or_default().push(artist);
    }

    for track in tracks.iter_mut() {
        track.artists = by_track.remove(&track.id).unwrap_or_default();
    }

    Ok(())
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Escapes LIKE wildcards so user input matches literally with `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Maps a database row to a Track without artists.
fn map_track_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        isrc: row.get(1)?,
        title: row.get(2)?,
        image_url: row.get(3)?,
        artists: Vec::new(),
    })
}

/// Maps a database row to an Artist.
fn map_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        name: row.get(1)?,
        track_id: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db_memory;

    fn seed(conn: &Connection, isrc: &str, artists: &[&str]) -> i64 {
        let track_id = insert_track(
            conn,
            &NewTrack {
                isrc,
                title: &format!("Song {isrc}"),
                image_url: None,
            },
        )
        .unwrap();
        for name in artists {
            insert_artist(conn, track_id, name).unwrap();
        }
        track_id
    }

    #[test]
    fn test_find_track_by_isrc_is_case_sensitive() {
        let conn = init_db_memory().unwrap();
        seed(&conn, "USABC1234567", &["Someone"]);

        let found = find_track_by_isrc(&conn, "USABC1234567").unwrap().unwrap();
        assert_eq!(found.title, "Song USABC1234567");
        assert_eq!(found.artists.len(), 1);

        assert!(find_track_by_isrc(&conn, "usabc1234567").unwrap().is_none());
        assert!(track_exists(&conn, "USABC1234567").unwrap());
        assert!(!track_exists(&conn, "usabc1234567").unwrap());
    }

    #[test]
    fn test_artists_keep_insertion_order() {
        let conn = init_db_memory().unwrap();
        let id = seed(&conn, "ORDER1", &["Zed", "Alpha", "Mid"]);

        let track = get_track(&conn, id).unwrap().unwrap();
        let names: Vec<_> = track.artists.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Zed", "Alpha", "Mid"]);
    }

    #[test]
    fn test_find_artists_by_name_substring_ignores_case() {
        let conn = init_db_memory().unwrap();
        seed(&conn, "A1", &["Daft Punk"]);
        seed(&conn, "A2", &["Punk Rock Band"]);
        seed(&conn, "A3", &["Jazz Trio"]);

        let found = find_artists_by_name(&conn, "PUNK").unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_find_artists_by_name_folds_ascii_only() {
        let conn = init_db_memory().unwrap();
        seed(&conn, "U1", &["Björk"]);

        assert_eq!(find_artists_by_name(&conn, "BJÖRK").unwrap().len(), 0);
        assert_eq!(find_artists_by_name(&conn, "BJö").unwrap().len(), 1);
    }

    #[test]
    fn test_find_artists_by_name_escapes_wildcards() {
        let conn = init_db_memory().unwrap();
        seed(&conn, "W1", &["100% Hits"]);
        seed(&conn, "W2", &["100 Hits"]);
        seed(&conn, "W3", &["under_score"]);
        seed(&conn, "W4", &["underXscore"]);

        assert_eq!(find_artists_by_name(&conn, "100%").unwrap().len(), 1);
        assert_eq!(find_artists_by_name(&conn, "under_").unwrap().len(), 1);
        assert_eq!(find_artists_by_name(&conn, "%").unwrap().len(), 1);
    }

    #[test]
    fn test_list_tracks_pages_in_insertion_order() {
        let conn = init_db_memory().unwrap();
        for i in 0..7 {
            seed(&conn, &format!("PAGE{i}"), &["Artist"]);
        }

        let page = list_tracks(&conn, 2, 3).unwrap();
        let isrcs: Vec<_> = page.iter().map(|t| t.isrc.as_str()).collect();
        assert_eq!(isrcs, vec!["PAGE2", "PAGE3", "PAGE4"]);
        assert!(page.iter().all(|t| t.artists.len() == 1));

        assert_eq!(list_tracks(&conn, 5, 10).unwrap().len(), 2);
        assert!(list_tracks(&conn, 7, 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_tracks_by_ids() {
        let conn = init_db_memory().unwrap();
        let a = seed(&conn, "IDS1", &[]);
        let _b = seed(&conn, "IDS2", &[]);
        let c = seed(&conn, "IDS3", &[]);

        let tracks = list_tracks_by_ids(&conn, &[c, a], 0, 10).unwrap();
        let ids: Vec<_> = tracks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a, c]);

        let second = list_tracks_by_ids(&conn, &[c, a], 1, 10).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, c);

        assert!(list_tracks_by_ids(&conn, &[], 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_isrc_violates_unique_index() {
        let conn = init_db_memory().unwrap();
        seed(&conn, "DUP1", &[]);

        let err = insert_track(
            &conn,
            &NewTrack {
                isrc: "DUP1",
                title: "Again",
                image_url: None,
            },
        )
        .unwrap_err();
        assert!(crate::error::AppError::from(err).is_unique_violation());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c\\d"), "a\\%b\\_c\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
