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

//! Audio playback control and state management.
//!
//! The player is split into two layers:
//!
//! * **Backends** ([`MediaBackend`]) drive an actual playback engine. There are
//!   two of them: [`local`] plays files through libmpv, [`embed`] plays YouTube
//!   videos through a separate, asynchronously initialised libmpv instance.
//! * The **state machine** ([`MusicPlayer`]) owns the playlist and transport
//!   settings, and reconciles what the user asked for with what the active
//!   backend reports.
//!
//! Backends never mutate player state directly. Everything they have to say
//! arrives on the application event channel as a [`BackendEvent`], and is
//! applied on the event loop thread one event at a time.

pub(crate) mod embed;
mod engine;
mod factory;
pub(crate) mod local;
mod machine;
mod poller;

pub(crate) use factory::MpvBackendFactory;
pub(crate) use machine::MusicPlayer;
pub(crate) use poller::ProgressPoller;

use std::sync::{Arc, Mutex};

use crate::{error::PlaybackError, model::Track};

/// Represents the current playback status of the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BackendKind {
    Local,
    Embedded,
}

/// The capability set shared by both playback engines.
///
/// Completion is not part of the trait: a backend reports the end of a track
/// asynchronously through [`BackendEvent::Finished`] (local) or
/// [`BackendEvent::EmbedState`] with [`EmbedState::Ended`] (embedded).
pub(crate) trait MediaBackend {
    fn kind(&self) -> BackendKind;

    /// Identifies this backend instance in the events it sends.
    fn instance(&self) -> u64;

    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self) -> Result<(), PlaybackError>;
    fn stop(&mut self) -> Result<(), PlaybackError>;
    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError>;
    fn current_time(&self) -> Result<f64, PlaybackError>;
    fn duration(&self) -> Result<f64, PlaybackError>;
    fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError>;

    /// Detaches from the engine. No events for this instance are delivered
    /// after this returns.
    fn release(&mut self);
}

/// Creates the backend matching a track.
pub(crate) trait BackendFactory {
    fn attach(&mut self, track: &Track) -> Result<Box<dyn MediaBackend>, PlaybackError>;
}

/// State codes reported by the embedded video player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EmbedState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Error(i32),
}

impl EmbedState {
    /// Translates a numeric player state code.
    pub(crate) fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(EmbedState::Unstarted),
            0 => Some(EmbedState::Ended),
            1 => Some(EmbedState::Playing),
            2 => Some(EmbedState::Paused),
            3 => Some(EmbedState::Buffering),
            5 => Some(EmbedState::Cued),
            _ => None,
        }
    }
}

/// Notifications sent by backends (and the embed API loader) to the event
/// loop.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum BackendEvent {
    TimeChanged { instance: u64, seconds: f64 },
    DurationChanged { instance: u64, seconds: f64 },
    Finished { instance: u64 },
    Rejected { instance: u64, reason: String },

    /// The embed API finished loading. Only the first one counts.
    EmbedApiReady,
    EmbedApiFailed(String),
    EmbedReady { instance: u64, duration: f64 },
    EmbedState { instance: u64, state: EmbedState },
}

/// Last known position of a backend instance, written by its worker thread.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Progress {
    pub(crate) instance: u64,
    pub(crate) time: f64,
    pub(crate) duration: f64,
}

pub(crate) type SharedProgress = Arc<Mutex<Progress>>;

pub(crate) fn read_progress(
    progress: &SharedProgress,
    instance: u64,
) -> Result<Progress, PlaybackError> {
    let progress = progress
        .lock()
        .map_err(|_| PlaybackError::BackendUnavailable("progress lock poisoned".into()))?;

    if progress.instance == instance {
        Ok(*progress)
    } else {
        Ok(Progress { instance, ..Progress::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_of_another_instance_reads_as_zero() {
        let shared: SharedProgress = Arc::new(Mutex::new(Progress {
            instance: 3,
            time: 12.5,
            duration: 60.0,
        }));

        assert_eq!(read_progress(&shared, 3).map(|p| p.time), Ok(12.5));
        assert_eq!(read_progress(&shared, 4).map(|p| p.duration), Ok(0.0));
    }

    #[test]
    fn embed_state_codes() {
        assert_eq!(EmbedState::from_code(-1), Some(EmbedState::Unstarted));
        assert_eq!(EmbedState::from_code(0), Some(EmbedState::Ended));
        assert_eq!(EmbedState::from_code(1), Some(EmbedState::Playing));
        assert_eq!(EmbedState::from_code(2), Some(EmbedState::Paused));
        assert_eq!(EmbedState::from_code(3), Some(EmbedState::Buffering));
        assert_eq!(EmbedState::from_code(5), Some(EmbedState::Cued));
        assert_eq!(EmbedState::from_code(4), None);
    }
}
