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

//! Playback error taxonomy.
//!
//! None of these errors are fatal. Each one is reported to the user on the
//! status line, and the player is always left either stopped or exactly as it
//! was before the failed action.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum PlaybackError {
    /// The video player was used before its readiness signal fired.
    #[error("video player is not ready yet, try again in a moment")]
    NotReady,

    #[error("the selected song has no playable source")]
    NoPlayableSource,

    /// The audio engine refused to start, e.g. the file could not be opened.
    #[error("playback was rejected: {0}")]
    PlaybackRejected(String),

    #[error("video cannot be played: {0}")]
    EmbeddedPlayer(EmbedErrorKind),

    /// A backend worker thread has gone away.
    #[error("player backend is unavailable: {0}")]
    BackendUnavailable(String),
}

/// Human readable categories for the numeric error codes reported by the
/// embedded video player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EmbedErrorKind {
    InvalidId,
    RestrictedEmbed,
    NotFound,
    Unknown(i32),
}

impl EmbedErrorKind {
    pub(crate) fn from_code(code: i32) -> Self {
        match code {
            2 => EmbedErrorKind::InvalidId,
            100 => EmbedErrorKind::NotFound,
            101 | 150 => EmbedErrorKind::RestrictedEmbed,
            other => EmbedErrorKind::Unknown(other),
        }
    }
}

impl fmt::Display for EmbedErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedErrorKind::InvalidId => write!(f, "invalid video id"),
            EmbedErrorKind::RestrictedEmbed => {
                write!(f, "the owner does not allow playback outside the site")
            }
            EmbedErrorKind::NotFound => write!(f, "video not found (removed or private)"),
            EmbedErrorKind::Unknown(code) => write!(f, "unknown error (code {})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_codes_map_to_categories() {
        assert_eq!(EmbedErrorKind::from_code(2), EmbedErrorKind::InvalidId);
        assert_eq!(EmbedErrorKind::from_code(100), EmbedErrorKind::NotFound);
        assert_eq!(EmbedErrorKind::from_code(101), EmbedErrorKind::RestrictedEmbed);
        assert_eq!(EmbedErrorKind::from_code(150), EmbedErrorKind::RestrictedEmbed);
        assert_eq!(EmbedErrorKind::from_code(5), EmbedErrorKind::Unknown(5));
    }

    #[test]
    fn embedded_error_message_carries_category() {
        let err = PlaybackError::EmbeddedPlayer(EmbedErrorKind::Unknown(7));
        assert_eq!(err.to_string(), "video cannot be played: unknown error (code 7)");
    }
}
