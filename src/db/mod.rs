// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Song library data access layer.
//!
//! This module handles all interactions with the SQLite database. The library
//! is a single `songs` table, each row is either a registered YouTube link or
//! an imported local audio file.
//!
//! # Performance
//!
//! Most functions in this module use [`rusqlite::Connection::prepare_cached`]
//! to reduce SQL parsing overhead.

mod model;
pub(crate) mod samples;
pub(crate) mod scan;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::model::{Song, SourceKind, youtube};

const UNKNOWN_TITLE: &str = "Unknown Title";

const SONG_COLUMNS: &str = "id, title, artist, album, duration_seconds, source, youtube_url, \
     file_url, play_count, created_at";

/// Opens a connection to the SQLite database and configures performance settings.
///
/// This function performs the following setup:
/// * **WAL Mode**: Enables Write-Ahead Logging for better concurrency.
/// * **Performance Tuning**: Sets synchronous mode to `NORMAL`.
/// * **Schema**: Executes [`create_schema`] to ensure the table and indices exist.
///
/// # Errors
///
/// Returns an error if the database file cannot be opened, or if the initial
/// configuration or schema creation fails.
pub(crate) fn init_db(path: &str) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;

    let journal_mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;
    if journal_mode != "wal" {
        anyhow::bail!(
            "Failed to switch to WAL mode. Current mode: {}",
            journal_mode
        );
    }

    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;

    conn.set_prepared_statement_cache_capacity(32);

    create_schema(&conn)?;

    Ok(conn)
}

/// Create the database schema.
///
/// `created_at` is filled in by SQLite. Songs are listed newest first, the
/// rowid breaks ties between songs added within the same second.
pub(crate) fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;

        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT,
            album TEXT,
            duration_seconds INTEGER,
            source TEXT NOT NULL,
            youtube_url TEXT,
            file_url TEXT UNIQUE,
            play_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_songs_created_at ON songs (created_at);

        COMMIT;",
    )
    .context("Failed to create schema")
}

/// Fetches every song, newest first.
pub(crate) fn fetch_songs(conn: &Connection) -> Result<Vec<Song>> {
    let sql = format!(
        "SELECT {} FROM songs ORDER BY created_at DESC, rowid DESC",
        SONG_COLUMNS
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    let results = stmt
        .query_map([], Song::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(results)
}

pub(crate) fn fetch_song(conn: &Connection, id: &str) -> Result<Option<Song>> {
    let sql = format!("SELECT {} FROM songs WHERE id = ?", SONG_COLUMNS);

    let mut stmt = conn.prepare_cached(&sql)?;
    let result = stmt.query_row([id], Song::from_row).optional()?;

    Ok(result)
}

/// Registers a YouTube link.
///
/// The link is stored as given, but it must contain a recognisable video id.
/// An empty title becomes "Unknown Title".
///
/// # Errors
///
/// Returns an error if the link has no video id or the insert fails.
pub(crate) fn add_youtube_song(
    conn: &Connection,
    url: &str,
    title: &str,
    artist: Option<&str>,
) -> Result<Song> {
    if youtube::extract_video_id(url).is_none() {
        anyhow::bail!("Not a YouTube video link: {}", url);
    }

    let id = Uuid::new_v4().to_string();
    let title = match title.trim() {
        "" => UNKNOWN_TITLE,
        title => title,
    };
    let artist = artist.map(str::trim).filter(|a| !a.is_empty());

    let mut stmt = conn.prepare_cached(
        "INSERT INTO songs (id, title, artist, source, youtube_url)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    stmt.execute(params![id, title, artist, SourceKind::Youtube, url])?;

    fetch_song(conn, &id)?.context("Inserted song has gone missing")
}

pub(crate) fn delete_song(conn: &Connection, id: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("DELETE FROM songs WHERE id = ?")?;
    let deleted = stmt.execute([id])?;

    Ok(deleted > 0)
}

pub(crate) fn increment_play_count(conn: &Connection, id: &str) -> Result<()> {
    let mut stmt =
        conn.prepare_cached("UPDATE songs SET play_count = play_count + 1 WHERE id = ?")?;
    stmt.execute([id])?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn registered_link_is_listed() {
        let conn = memory_db();

        let song = add_youtube_song(
            &conn,
            "https://youtu.be/dQw4w9WgXcQ",
            "Never Gonna Give You Up",
            Some("Rick Astley"),
        )
        .unwrap();

        assert_eq!(song.source, SourceKind::Youtube);
        assert_eq!(song.play_count, 0);
        assert_eq!(song.artist.as_deref(), Some("Rick Astley"));
        assert_eq!(fetch_songs(&conn).unwrap(), vec![song.clone()]);

        let track = song.to_track();
        assert!(track.is_youtube);
        assert_eq!(track.video_id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn links_without_a_video_are_refused() {
        let conn = memory_db();

        assert!(add_youtube_song(&conn, "https://example.com/a.mp3", "x", None).is_err());
        assert!(fetch_songs(&conn).unwrap().is_empty());
    }

    #[test]
    fn blank_fields_fall_back() {
        let conn = memory_db();

        let song =
            add_youtube_song(&conn, "https://youtu.be/dQw4w9WgXcQ", "  ", Some("")).unwrap();

        assert_eq!(song.title, UNKNOWN_TITLE);
        assert_eq!(song.artist, None);
    }

    #[test]
    fn newest_song_comes_first() {
        let conn = memory_db();
        let first = add_youtube_song(&conn, "https://youtu.be/aaaaaaaaaaa", "First", None).unwrap();
        let second =
            add_youtube_song(&conn, "https://youtu.be/bbbbbbbbbbb", "Second", None).unwrap();

        let ids: Vec<String> = fetch_songs(&conn).unwrap().into_iter().map(|s| s.id).collect();

        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn play_count_and_delete() {
        let conn = memory_db();
        let song = add_youtube_song(&conn, "https://youtu.be/dQw4w9WgXcQ", "t", None).unwrap();

        increment_play_count(&conn, &song.id).unwrap();
        increment_play_count(&conn, &song.id).unwrap();
        assert_eq!(fetch_song(&conn, &song.id).unwrap().map(|s| s.play_count), Some(2));

        assert!(delete_song(&conn, &song.id).unwrap());
        assert!(!delete_song(&conn, &song.id).unwrap());
        assert_eq!(fetch_song(&conn, &song.id).unwrap(), None);
    }

    #[test]
    fn file_database_survives_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.db");
        let path = path.to_str().unwrap();

        let id = {
            let conn = init_db(path).unwrap();
            add_youtube_song(&conn, "https://youtu.be/dQw4w9WgXcQ", "Kept", None)
                .unwrap()
                .id
        };

        let conn = init_db(path).unwrap();
        let songs = fetch_songs(&conn).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, id);
        assert_eq!(songs[0].title, "Kept");
    }
}
