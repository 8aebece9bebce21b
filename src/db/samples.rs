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

//! Demo songs.
//!
//! Writes a couple of short sine tones as WAV files and registers them as
//! `sample` songs, so the player can be tried out on an empty library.

use std::{f32::consts::PI, fs, path::Path};

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use rusqlite::{Connection, params};
use tracing::info;
use uuid::Uuid;

use crate::model::SourceKind;

const SAMPLE_RATE: u32 = 44_100;

struct SampleTone {
    file_name: &'static str,
    title: &'static str,
    artist: &'static str,
    album: &'static str,
    frequency: f32,
    duration_seconds: u32,
}

const SAMPLE_TONES: [SampleTone; 2] = [
    SampleTone {
        file_name: "sample-sound-1.wav",
        title: "Sample Sound 1",
        artist: "Test Artist",
        album: "Demo Collection",
        frequency: 440.0,
        duration_seconds: 3,
    },
    SampleTone {
        file_name: "sample-sound-2.wav",
        title: "Sample Sound 2",
        artist: "Demo Artist",
        album: "Test Album",
        frequency: 660.0,
        duration_seconds: 3,
    },
];

/// Writes the sample tones into `dir` and adds them to the library.
///
/// Samples that are already in the library are left alone. Returns the
/// number of songs added.
///
/// # Errors
///
/// Returns an error if a file cannot be written or the insert fails.
pub(crate) fn add_sample_songs(conn: &mut Connection, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create sample directory {}", dir.display()))?;

    let tx = conn.transaction()?;
    let mut added = 0;

    {
        let mut insert = tx.prepare_cached(
            "INSERT OR IGNORE INTO songs (id, title, artist, album, duration_seconds, source, file_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;

        for tone in &SAMPLE_TONES {
            let path = dir.join(tone.file_name);
            if !path.exists() {
                write_tone(&path, tone.frequency, tone.duration_seconds)?;
            }

            let file_url = path.to_string_lossy();
            added += insert.execute(params![
                Uuid::new_v4().to_string(),
                tone.title,
                tone.artist,
                tone.album,
                tone.duration_seconds,
                SourceKind::Sample,
                file_url.as_ref(),
            ])?;
        }
    }

    tx.commit().context("Failed to commit samples")?;

    info!(added, dir = %dir.display(), "Sample songs added");

    Ok(added)
}

fn write_tone(path: &Path, frequency: f32, duration_seconds: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    for i in 0..SAMPLE_RATE * duration_seconds {
        let t = i as f32 / SAMPLE_RATE as f32;
        let amplitude = (t * frequency * 2.0 * PI).sin() * f32::from(i16::MAX) * 0.3;
        writer.write_sample(amplitude as i16)?;
    }

    writer.finalize()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{fetch_songs, tests::memory_db};

    #[test]
    fn samples_are_added_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = memory_db();

        assert_eq!(add_sample_songs(&mut conn, dir.path()).unwrap(), 2);
        assert_eq!(add_sample_songs(&mut conn, dir.path()).unwrap(), 0);

        let songs = fetch_songs(&conn).unwrap();
        assert_eq!(songs.len(), 2);
        assert!(songs.iter().all(|s| s.source == SourceKind::Sample));
        assert!(songs.iter().all(|s| s.duration_seconds == Some(3)));

        let track = songs[0].to_track();
        assert!(track.is_playable);
        assert!(!track.is_youtube);
    }

    #[test]
    fn sample_tones_are_valid_wav() {
        let dir = tempfile::tempdir().unwrap();
        let mut conn = memory_db();
        add_sample_songs(&mut conn, dir.path()).unwrap();

        let reader = hound::WavReader::open(dir.path().join("sample-sound-1.wav")).unwrap();
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.duration(), SAMPLE_RATE * 3);
    }
}
