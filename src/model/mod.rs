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

//! Domain models and core data structures.
//!
//! This module defines the two central entities of the application: the
//! [`Song`], which is what the library stores, and the [`Track`], which is
//! what the player consumes. A track is always derived from a song and is
//! never modified afterwards.

pub(crate) mod youtube;

const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Duration assumed for songs whose length was never recorded.
pub(crate) const DEFAULT_DURATION_SECS: u64 = 180;

/// A playable unit as seen by the player.
///
/// Use the constructors, they uphold the invariants that a YouTube track
/// always has a video id and a playable track always has a source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Track {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) duration: u64,
    pub(crate) source_url: Option<String>,
    pub(crate) is_playable: bool,
    pub(crate) is_youtube: bool,
    pub(crate) video_id: Option<String>,
}

impl Track {
    /// A track backed by a local file or any other URL the audio engine can
    /// open directly.
    pub(crate) fn local(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration: u64,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration,
            source_url: Some(source_url.into()),
            is_playable: true,
            is_youtube: false,
            video_id: None,
        }
    }

    /// A track played through the embedded video player.
    pub(crate) fn youtube(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration: u64,
        video_id: impl Into<String>,
    ) -> Self {
        let video_id = video_id.into();
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration,
            source_url: Some(youtube::watch_url(&video_id)),
            is_playable: true,
            is_youtube: true,
            video_id: Some(video_id),
        }
    }

    /// A track that is listed but has nothing to play.
    pub(crate) fn unplayable(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        duration: u64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration,
            source_url: None,
            is_playable: false,
            is_youtube: false,
            video_id: None,
        }
    }
}

/// Where a song's audio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceKind {
    Upload,
    Youtube,
    Sample,
}

impl SourceKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Upload => "upload",
            SourceKind::Youtube => "youtube",
            SourceKind::Sample => "sample",
        }
    }
}

/// A song registered in the library.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Song {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) artist: Option<String>,
    pub(crate) album: Option<String>,
    pub(crate) duration_seconds: Option<i64>,
    pub(crate) source: SourceKind,
    pub(crate) youtube_url: Option<String>,
    pub(crate) file_url: Option<String>,
    pub(crate) play_count: i64,
    pub(crate) created_at: String,
}

impl Song {
    /// Builds the player's view of this song.
    ///
    /// A YouTube link without a recognisable video id, or a file song without
    /// a file, produces an unplayable track rather than an error so that the
    /// song still shows up in the playlist.
    pub(crate) fn to_track(&self) -> Track {
        let artist = self.artist.clone().unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let album = self.album.clone().unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
        let duration = self
            .duration_seconds
            .and_then(|secs| u64::try_from(secs).ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_DURATION_SECS);

        match (self.source, &self.file_url, &self.youtube_url) {
            (SourceKind::Upload | SourceKind::Sample, Some(file_url), _) => {
                Track::local(&self.id, &self.title, artist, album, duration, file_url)
            }
            (SourceKind::Youtube, _, Some(url)) => match youtube::extract_video_id(url) {
                Some(video_id) => {
                    Track::youtube(&self.id, &self.title, artist, album, duration, video_id)
                }
                None => Track::unplayable(&self.id, &self.title, artist, album, duration),
            },
            _ => Track::unplayable(&self.id, &self.title, artist, album, duration),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn song(id: &str, source: SourceKind) -> Song {
        Song {
            id: id.to_string(),
            title: format!("Song {}", id),
            artist: None,
            album: None,
            duration_seconds: None,
            source,
            youtube_url: None,
            file_url: None,
            play_count: 0,
            created_at: "2026-01-01 00:00:00".to_string(),
        }
    }

    #[test]
    fn upload_song_becomes_local_track() {
        let mut s = song("1", SourceKind::Upload);
        s.file_url = Some("/music/a.mp3".to_string());
        s.duration_seconds = Some(216);
        s.artist = Some("Eurythmics".to_string());

        let track = s.to_track();

        assert!(track.is_playable);
        assert!(!track.is_youtube);
        assert_eq!(track.source_url.as_deref(), Some("/music/a.mp3"));
        assert_eq!(track.duration, 216);
        assert_eq!(track.artist, "Eurythmics");
        assert_eq!(track.album, UNKNOWN_ALBUM);
    }

    #[test]
    fn youtube_song_becomes_video_track() {
        let mut s = song("2", SourceKind::Youtube);
        s.youtube_url = Some("https://youtu.be/dQw4w9WgXcQ".to_string());

        let track = s.to_track();

        assert!(track.is_playable);
        assert!(track.is_youtube);
        assert_eq!(track.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(track.duration, DEFAULT_DURATION_SECS);
        assert_eq!(track.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn broken_sources_become_unplayable() {
        let mut bad_link = song("3", SourceKind::Youtube);
        bad_link.youtube_url = Some("https://example.com/not-a-video".to_string());
        let missing_file = song("4", SourceKind::Upload);

        for track in [bad_link.to_track(), missing_file.to_track()] {
            assert!(!track.is_playable);
            assert!(!track.is_youtube);
            assert!(track.source_url.is_none());
        }
    }

    #[test]
    fn constructors_uphold_invariants() {
        let yt = Track::youtube("1", "t", "a", "b", 10, "dQw4w9WgXcQ");
        assert!(yt.video_id.is_some());
        assert!(yt.source_url.is_some());

        let local = Track::local("2", "t", "a", "b", 10, "/tmp/x.flac");
        assert!(local.is_playable && local.source_url.is_some());
    }
}
