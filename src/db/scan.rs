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

//! Local audio file import.
//!
//! Walks the configured media directories with `WalkDir` and registers every
//! audio file found as an `upload` song, with metadata read by `Lofty`.
//!
//! Imports are additive. A file that is already in the library keeps its row,
//! play count included, because its id is derived from its path.

use anyhow::{Context, Result};
use lofty::prelude::*;
use lofty::probe::Probe;
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

use crate::model::SourceKind;

const AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "flac", "ogg", "opus", "m4a", "wav", "aac"];

/// Imports every audio file below `roots`.
///
/// Files that cannot be read are skipped. Returns the number of songs added.
///
/// # Errors
///
/// Returns an error if the transaction fails.
pub(crate) fn import_media_dirs<P: AsRef<Path>>(conn: &mut Connection, roots: &[P]) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut added = 0;

    {
        let mut insert = tx.prepare_cached(
            "INSERT OR IGNORE INTO songs (id, title, artist, album, duration_seconds, source, file_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for root in roots {
            let root = root.as_ref();
            info!(root = %root.display(), "Importing media directory");

            for entry in WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_audio_file(e.path()))
            {
                let path = entry.path();

                let Some(file_url) = path.to_str() else {
                    warn!(path = ?path, "Skipping path that is not valid UTF-8");
                    continue;
                };

                let metadata = read_metadata(path);
                added += insert.execute(params![
                    song_id(file_url),
                    metadata.title,
                    metadata.artist,
                    metadata.album,
                    metadata.duration_seconds,
                    SourceKind::Upload,
                    file_url,
                ])?;
            }
        }
    }

    tx.commit().context("Failed to commit import")?;

    info!(added, "Import finished");

    Ok(added)
}

/// Stable id for an imported file.
fn song_id(file_url: &str) -> String {
    format!("file-{:016x}", xxh3_64(file_url.as_bytes()))
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

struct FileMetadata {
    title: String,
    artist: Option<String>,
    album: Option<String>,
    duration_seconds: Option<i64>,
}

/// Reads tags, falling back to the file name when there are none.
fn read_metadata(path: &Path) -> FileMetadata {
    let fallback_title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();

    let tagged_file = match Probe::open(path).and_then(|p| p.read()) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No readable metadata");
            return FileMetadata {
                title: fallback_title,
                artist: None,
                album: None,
                duration_seconds: None,
            };
        }
    };

    let duration_seconds = i64::try_from(tagged_file.properties().duration().as_secs())
        .ok()
        .filter(|secs| *secs > 0);

    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

    FileMetadata {
        title: tag
            .and_then(|t| t.title())
            .map(|t| t.to_string())
            .unwrap_or(fallback_title),
        artist: tag.and_then(|t| t.artist()).map(|a| a.to_string()),
        album: tag.and_then(|t| t.album()).map(|a| a.to_string()),
        duration_seconds,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::db::{fetch_songs, tests::memory_db};

    #[test]
    fn recognises_audio_extensions() {
        assert!(is_audio_file(Path::new("/music/a.mp3")));
        assert!(is_audio_file(Path::new("/music/b.FLAC")));
        assert!(!is_audio_file(Path::new("/music/cover.jpg")));
        assert!(!is_audio_file(Path::new("/music/README")));
    }

    #[test]
    fn ids_are_stable_per_path() {
        assert_eq!(song_id("/music/a.mp3"), song_id("/music/a.mp3"));
        assert_ne!(song_id("/music/a.mp3"), song_id("/music/b.mp3"));
    }

    #[test]
    fn imports_untagged_files_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("album")).unwrap();
        fs::write(dir.path().join("album").join("Intro.mp3"), b"not really audio").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut conn = memory_db();

        assert_eq!(import_media_dirs(&mut conn, &[dir.path()]).unwrap(), 1);
        assert_eq!(import_media_dirs(&mut conn, &[dir.path()]).unwrap(), 0);

        let songs = fetch_songs(&conn).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Intro");
        assert_eq!(songs[0].source, SourceKind::Upload);

        let track = songs[0].to_track();
        assert!(track.is_playable);
        assert!(!track.is_youtube);
    }
}
