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

//! The playback state machine.
//!
//! [`MusicPlayer`] is the single source of truth for what is playing. It owns
//! the playlist, the transport settings and at most one attached backend, and
//! it is only ever mutated from the event loop thread.
//!
//! # Transitions
//!
//! ```text
//! stopped --play--> playing --pause--> paused --play--> playing
//!    ^                 |  \
//!    +------stop-------+   +--completion--> playing (repeat / auto-advance)
//!    +-------------completion (last track)---+
//! ```
//!
//! Every failing action leaves the player either stopped or unchanged, and the
//! error is handed back to the caller to be reported.

use rand::{rng, seq::SliceRandom};
use tracing::{debug, info, warn};

use crate::{
    error::{EmbedErrorKind, PlaybackError},
    model::Track,
    player::{BackendEvent, BackendFactory, BackendKind, EmbedState, MediaBackend, PlaybackState},
    util::format::{format_time, progress_percent},
};

pub(crate) const MAX_VOLUME: u8 = 100;

pub(crate) struct MusicPlayer {
    factory: Box<dyn BackendFactory>,
    backend: Option<Box<dyn MediaBackend>>,

    playlist: Vec<Track>,
    // Play order over playlist indices, the identity unless shuffling.
    order: Vec<usize>,
    current_index: usize,
    current_track: Option<Track>,

    current_time: f64,
    duration: f64,

    volume: u8,
    shuffle: bool,
    repeat: bool,

    state: PlaybackState,
}

impl MusicPlayer {
    pub(crate) fn new(factory: Box<dyn BackendFactory>, volume: u8) -> Self {
        Self {
            factory,
            backend: None,
            playlist: Vec::new(),
            order: Vec::new(),
            current_index: 0,
            current_track: None,
            current_time: 0.0,
            duration: 0.0,
            volume: volume.min(MAX_VOLUME),
            shuffle: false,
            repeat: false,
            state: PlaybackState::Stopped,
        }
    }

    pub(crate) fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub(crate) fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub(crate) fn current_index(&self) -> usize {
        self.current_index
    }

    pub(crate) fn current_time(&self) -> f64 {
        self.current_time
    }

    pub(crate) fn duration(&self) -> f64 {
        self.duration
    }

    pub(crate) fn volume(&self) -> u8 {
        self.volume
    }

    pub(crate) fn is_shuffling(&self) -> bool {
        self.shuffle
    }

    pub(crate) fn is_repeating(&self) -> bool {
        self.repeat
    }

    pub(crate) fn state(&self) -> PlaybackState {
        self.state
    }

    pub(crate) fn formatted_time(&self) -> String {
        format_time(self.current_time)
    }

    pub(crate) fn formatted_duration(&self) -> String {
        format_time(self.duration)
    }

    /// Percentage of the current track played so far.
    pub(crate) fn progress(&self) -> f64 {
        progress_percent(self.current_time, self.duration)
    }

    pub(crate) fn active_backend(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    /// Whether the progress poller should be running.
    ///
    /// Only the embedded backend needs polling, the local backend pushes its
    /// time updates.
    pub(crate) fn wants_polling(&self) -> bool {
        self.state == PlaybackState::Playing
            && self.active_backend() == Some(BackendKind::Embedded)
    }

    /// Replaces the playlist and selects its first track.
    pub(crate) fn load_playlist(&mut self, tracks: Vec<Track>) -> Result<(), PlaybackError> {
        self.load_playlist_at(tracks, 0)
    }

    /// Replaces the playlist and selects the track at `index` (clamped to the
    /// last track). Playback is left stopped.
    pub(crate) fn load_playlist_at(
        &mut self,
        tracks: Vec<Track>,
        index: usize,
    ) -> Result<(), PlaybackError> {
        self.playlist = tracks;
        self.rebuild_order();

        info!(tracks = self.playlist.len(), index, "Loading playlist");

        if self.playlist.is_empty() {
            self.detach();
            self.current_index = 0;
            self.current_track = None;
            self.current_time = 0.0;
            self.duration = 0.0;
            self.state = PlaybackState::Stopped;
            return Ok(());
        }

        let index = index.min(self.playlist.len() - 1);
        self.switch_to(index)
    }

    /// Selects a playlist entry without starting playback.
    pub(crate) fn select(&mut self, index: usize) -> Result<(), PlaybackError> {
        if index >= self.playlist.len() {
            return Ok(());
        }

        self.switch_to(index)
    }

    /// Makes `track` the current track, swapping in the matching backend.
    ///
    /// If the track is part of the playlist the current index follows it.
    pub(crate) fn set_current_track(&mut self, track: Track) -> Result<(), PlaybackError> {
        if let Some(index) = self.playlist.iter().position(|t| t.id == track.id) {
            self.current_index = index;
        }

        self.attach_track(track)
    }

    pub(crate) fn play(&mut self) -> Result<(), PlaybackError> {
        if self.current_track.is_none() {
            return Err(PlaybackError::NoPlayableSource);
        }

        let backend = self
            .backend
            .as_mut()
            .ok_or(PlaybackError::NoPlayableSource)?;
        backend.play()?;

        self.state = PlaybackState::Playing;

        Ok(())
    }

    pub(crate) fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }

        if let Some(backend) = self.backend.as_mut() {
            backend.pause()?;
        }

        self.state = PlaybackState::Paused;

        Ok(())
    }

    pub(crate) fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused | PlaybackState::Stopped => self.play(),
        }
    }

    /// Stops playback and rewinds. The player is stopped even if the backend
    /// refuses, the backend's error is still returned for reporting.
    pub(crate) fn stop(&mut self) -> Result<(), PlaybackError> {
        let result = match self.backend.as_mut() {
            Some(backend) => backend.stop(),
            None => Ok(()),
        };

        self.current_time = 0.0;
        self.state = PlaybackState::Stopped;

        result
    }

    pub(crate) fn next(&mut self) -> Result<(), PlaybackError> {
        match self.next_index() {
            Some(index) if index != self.current_index => self.advance_to(index),
            _ => Ok(()),
        }
    }

    pub(crate) fn previous(&mut self) -> Result<(), PlaybackError> {
        match self.previous_index() {
            Some(index) if index != self.current_index => self.advance_to(index),
            _ => Ok(()),
        }
    }

    /// Seeks to `seconds`, clamped to the current track's duration.
    pub(crate) fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if self.current_track.is_none() {
            return Ok(());
        }

        let target = self.clamp_time(seconds);
        if let Some(backend) = self.backend.as_mut() {
            backend.seek(target)?;
        }

        self.current_time = target;

        Ok(())
    }

    pub(crate) fn seek_by(&mut self, delta: f64) -> Result<(), PlaybackError> {
        self.seek(self.current_time + delta)
    }

    /// Sets the volume, clamped to `0..=100`. The level is kept even if the
    /// backend could not apply it, it is re-applied on the next attach.
    pub(crate) fn set_volume(&mut self, volume: i32) -> Result<(), PlaybackError> {
        self.volume = volume.clamp(0, i32::from(MAX_VOLUME)) as u8;

        match self.backend.as_mut() {
            Some(backend) => backend.set_volume(self.volume),
            None => Ok(()),
        }
    }

    pub(crate) fn adjust_volume(&mut self, delta: i32) -> Result<(), PlaybackError> {
        self.set_volume(i32::from(self.volume) + delta)
    }

    pub(crate) fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
        info!(repeat = self.repeat, "Repeat toggled");
    }

    pub(crate) fn toggle_shuffle(&mut self) {
        self.shuffle = !self.shuffle;
        self.rebuild_order();
        info!(shuffle = self.shuffle, "Shuffle toggled");
    }

    /// Applies the end of the current track.
    ///
    /// With repeat on the same track restarts. Otherwise the player advances
    /// to the next track and keeps playing, unless the next track is the
    /// current one (a single track playlist), in which case it stops.
    pub(crate) fn handle_completion(&mut self) -> Result<(), PlaybackError> {
        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "Ignoring completion outside of playback");
            return Ok(());
        }

        if self.repeat {
            self.current_time = 0.0;
            let restarted = match self.backend.as_mut() {
                Some(backend) => match backend.seek(0.0) {
                    Ok(()) => backend.play(),
                    Err(e) => Err(e),
                },
                None => Ok(()),
            };
            if restarted.is_err() {
                self.state = PlaybackState::Stopped;
            }
            return restarted;
        }

        match self.next_index() {
            Some(index) if index != self.current_index => {
                debug!(index, "Auto-advancing");
                self.switch_to(index)?;
                self.play()
            }
            _ => {
                self.state = PlaybackState::Stopped;
                self.current_time = 0.0;
                Ok(())
            }
        }
    }

    /// Applies a notification from a backend.
    ///
    /// Events from any backend instance other than the attached one are
    /// dropped, a released backend can still have events in flight.
    pub(crate) fn handle_backend_event(
        &mut self,
        event: BackendEvent,
    ) -> Result<(), PlaybackError> {
        match event {
            BackendEvent::TimeChanged { instance, seconds } => {
                if self.is_attached(instance, BackendKind::Local) {
                    self.current_time = self.clamp_time(seconds);
                }
                Ok(())
            }

            BackendEvent::DurationChanged { instance, seconds } => {
                if self.is_attached(instance, BackendKind::Local) && seconds > 0.0 {
                    self.duration = seconds;
                }
                Ok(())
            }

            BackendEvent::Finished { instance } => {
                if self.is_attached(instance, BackendKind::Local) {
                    self.handle_completion()
                } else {
                    Ok(())
                }
            }

            BackendEvent::Rejected { instance, reason } => {
                if self.is_attached(instance, BackendKind::Local) {
                    self.state = PlaybackState::Stopped;
                    Err(PlaybackError::PlaybackRejected(reason))
                } else {
                    Ok(())
                }
            }

            BackendEvent::EmbedReady { instance, duration } => {
                if self.is_attached(instance, BackendKind::Embedded) && duration > 0.0 {
                    self.duration = duration;
                }
                Ok(())
            }

            BackendEvent::EmbedState { instance, state } => {
                if self.is_attached(instance, BackendKind::Embedded) {
                    self.handle_embed_state(state)
                } else {
                    debug!(instance, ?state, "Dropping event from detached video player");
                    Ok(())
                }
            }

            // The embed API lifecycle belongs to the application, not to the
            // player.
            BackendEvent::EmbedApiReady | BackendEvent::EmbedApiFailed(_) => Ok(()),
        }
    }

    /// Samples time and duration from the embedded backend.
    pub(crate) fn poll_progress(&mut self) -> Result<(), PlaybackError> {
        if !self.wants_polling() {
            return Ok(());
        }

        let Some(backend) = self.backend.as_ref() else {
            return Ok(());
        };

        let time = backend.current_time()?;
        let duration = backend.duration()?;

        if duration > 0.0 {
            self.duration = duration;
        }
        self.current_time = self.clamp_time(time);

        Ok(())
    }

    /// Releases the attached backend, for application exit.
    pub(crate) fn shutdown(&mut self) {
        self.detach();
        self.state = PlaybackState::Stopped;
    }

    fn handle_embed_state(&mut self, state: EmbedState) -> Result<(), PlaybackError> {
        match state {
            // Playback only ever starts through play(), so a start or pause
            // reported while stopped predates the stop.
            EmbedState::Playing | EmbedState::Paused if self.state == PlaybackState::Stopped => {
                debug!(?state, "Ignoring video state while stopped");
                Ok(())
            }
            EmbedState::Playing => {
                self.state = PlaybackState::Playing;
                Ok(())
            }
            EmbedState::Paused => {
                if self.state == PlaybackState::Playing {
                    self.state = PlaybackState::Paused;
                }
                Ok(())
            }
            EmbedState::Ended => self.handle_completion(),
            EmbedState::Error(code) => {
                self.state = PlaybackState::Stopped;
                Err(PlaybackError::EmbeddedPlayer(EmbedErrorKind::from_code(code)))
            }
            EmbedState::Unstarted | EmbedState::Buffering | EmbedState::Cued => Ok(()),
        }
    }

    fn is_attached(&self, instance: u64, kind: BackendKind) -> bool {
        self.backend
            .as_ref()
            .is_some_and(|b| b.instance() == instance && b.kind() == kind)
    }

    // Moves to another playlist entry, carrying a playing state over.
    fn advance_to(&mut self, index: usize) -> Result<(), PlaybackError> {
        let was_playing = self.state == PlaybackState::Playing;

        self.switch_to(index)?;

        if was_playing { self.play() } else { Ok(()) }
    }

    fn switch_to(&mut self, index: usize) -> Result<(), PlaybackError> {
        let track = self.playlist[index].clone();
        self.current_index = index;
        self.set_current_track(track)
    }

    fn attach_track(&mut self, track: Track) -> Result<(), PlaybackError> {
        // The old backend must be gone before the new one can send anything.
        self.detach();

        self.current_time = 0.0;
        self.duration = track.duration as f64;
        self.state = PlaybackState::Stopped;

        let attached = if track.is_playable {
            self.factory.attach(&track).map(Some)
        } else {
            Ok(None)
        };

        debug!(id = %track.id, title = %track.title, youtube = track.is_youtube, "Track selected");
        self.current_track = Some(track);

        let mut backend = attached?;
        if let Some(backend) = backend.as_mut() {
            if let Err(e) = backend.set_volume(self.volume) {
                debug!(error = %e, "Volume not applied to new backend");
            }
        }
        self.backend = backend;

        Ok(())
    }

    fn detach(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            debug!(instance = backend.instance(), kind = ?backend.kind(), "Releasing backend");
            backend.release();
        }
    }

    fn rebuild_order(&mut self) {
        self.order = (0..self.playlist.len()).collect();
        if self.shuffle {
            let mut rng = rng();
            self.order.shuffle(&mut rng);
        }
    }

    fn position_in_order(&self) -> usize {
        self.order
            .iter()
            .position(|&i| i == self.current_index)
            .unwrap_or(0)
    }

    fn next_index(&self) -> Option<usize> {
        let len = self.order.len();
        if len == 0 {
            return None;
        }

        Some(self.order[(self.position_in_order() + 1) % len])
    }

    fn previous_index(&self) -> Option<usize> {
        let len = self.order.len();
        if len == 0 {
            return None;
        }

        Some(self.order[(self.position_in_order() + len - 1) % len])
    }

    fn clamp_time(&self, seconds: f64) -> f64 {
        if seconds.is_nan() {
            return 0.0;
        }

        seconds.clamp(0.0, self.duration.max(0.0))
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        if self.backend.is_some() {
            warn!("Player dropped with an attached backend, releasing it");
            self.detach();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        cell::{Cell, RefCell},
        collections::HashSet,
        rc::Rc,
    };

    use proptest::prelude::*;

    use super::*;

    /// Shared state between the fake factory, its backends and the test.
    #[derive(Default)]
    pub(crate) struct Fakes {
        pub(crate) calls: RefCell<Vec<String>>,
        pub(crate) embed_ready: Cell<bool>,
        pub(crate) reject_play: Cell<bool>,
        pub(crate) embed_time: Cell<f64>,
        pub(crate) embed_duration: Cell<f64>,
        next_instance: Cell<u64>,
    }

    impl Fakes {
        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub(crate) fn clear(&self) {
            self.calls.borrow_mut().clear();
        }
    }

    struct FakeFactory(Rc<Fakes>);

    impl BackendFactory for FakeFactory {
        fn attach(&mut self, track: &Track) -> Result<Box<dyn MediaBackend>, PlaybackError> {
            let instance = self.0.next_instance.get() + 1;
            self.0.next_instance.set(instance);

            let kind = if track.is_youtube {
                BackendKind::Embedded
            } else {
                BackendKind::Local
            };
            self.0.record(format!("attach {:?} #{} {}", kind, instance, track.id));

            Ok(Box::new(FakeBackend {
                kind,
                instance,
                fakes: Rc::clone(&self.0),
            }))
        }
    }

    struct FakeBackend {
        kind: BackendKind,
        instance: u64,
        fakes: Rc<Fakes>,
    }

    impl FakeBackend {
        fn call(&self, op: &str) -> Result<(), PlaybackError> {
            if self.kind == BackendKind::Embedded && !self.fakes.embed_ready.get() {
                return Err(PlaybackError::NotReady);
            }
            self.fakes.record(format!("{} #{}", op, self.instance));
            Ok(())
        }
    }

    impl MediaBackend for FakeBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn instance(&self) -> u64 {
            self.instance
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            self.call("play")?;
            if self.fakes.reject_play.get() {
                return Err(PlaybackError::PlaybackRejected("autoplay blocked".into()));
            }
            Ok(())
        }

        fn pause(&mut self) -> Result<(), PlaybackError> {
            self.call("pause")
        }

        fn stop(&mut self) -> Result<(), PlaybackError> {
            self.call("stop")
        }

        fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
            self.call(&format!("seek {}", seconds))
        }

        fn current_time(&self) -> Result<f64, PlaybackError> {
            self.call("time")?;
            Ok(self.fakes.embed_time.get())
        }

        fn duration(&self) -> Result<f64, PlaybackError> {
            self.call("duration")?;
            Ok(self.fakes.embed_duration.get())
        }

        fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError> {
            self.call(&format!("volume {}", volume))
        }

        fn release(&mut self) {
            self.fakes.record(format!("release #{}", self.instance));
        }
    }

    fn player() -> (MusicPlayer, Rc<Fakes>) {
        let fakes = Rc::new(Fakes::default());
        fakes.embed_ready.set(true);
        let player = MusicPlayer::new(Box::new(FakeFactory(Rc::clone(&fakes))), 75);
        (player, fakes)
    }

    fn local(id: &str) -> Track {
        Track::local(id, format!("Title {}", id), "Artist", "Album", 200, format!("/music/{}.mp3", id))
    }

    fn video(id: &str) -> Track {
        Track::youtube(id, format!("Video {}", id), "Artist", "Album", 240, "dQw4w9WgXcQ")
    }

    fn locals(n: usize) -> Vec<Track> {
        (0..n).map(|i| local(&i.to_string())).collect()
    }

    fn current_id(player: &MusicPlayer) -> Option<&str> {
        player.current_track().map(|t| t.id.as_str())
    }

    #[test]
    fn load_playlist_selects_first_track_stopped() {
        let (mut player, fakes) = player();

        player.load_playlist(vec![local("a"), local("b")]).unwrap();

        assert_eq!(current_id(&player), Some("a"));
        assert_eq!(player.current_index(), 0);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.duration(), 200.0);
        assert_eq!(fakes.calls(), vec!["attach Local #1 a", "volume 75 #1"]);
    }

    #[test]
    fn empty_playlist_clears_current_track() {
        let (mut player, fakes) = player();
        player.load_playlist(vec![local("a")]).unwrap();

        player.load_playlist(vec![]).unwrap();

        assert_eq!(player.current_track(), None);
        assert_eq!(player.active_backend(), None);
        assert!(fakes.calls().contains(&"release #1".to_string()));
    }

    #[test]
    fn play_without_track_is_reported() {
        let (mut player, _) = player();

        assert_eq!(player.play(), Err(PlaybackError::NoPlayableSource));
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn play_unplayable_track_is_reported() {
        let (mut player, fakes) = player();
        player
            .set_current_track(Track::unplayable("x", "Broken", "A", "B", 100))
            .unwrap();

        assert_eq!(player.play(), Err(PlaybackError::NoPlayableSource));
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(fakes.calls().is_empty());
    }

    #[test]
    fn transport_transitions() {
        let (mut player, fakes) = player();
        player.load_playlist(vec![local("a")]).unwrap();
        fakes.clear();

        player.play().unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);

        player.seek(50.0).unwrap();
        player.pause().unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);

        player.toggle_play_pause().unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);

        player.stop().unwrap();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.current_time(), 0.0);

        assert_eq!(
            fakes.calls(),
            vec!["play #1", "seek 50 #1", "pause #1", "play #1", "stop #1"]
        );
    }

    #[test]
    fn pause_outside_playback_does_nothing() {
        let (mut player, fakes) = player();
        player.load_playlist(vec![local("a")]).unwrap();
        fakes.clear();

        player.pause().unwrap();

        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(fakes.calls().is_empty());
    }

    #[test]
    fn rejected_play_leaves_state_unchanged() {
        let (mut player, fakes) = player();
        player.load_playlist(vec![local("a")]).unwrap();
        fakes.reject_play.set(true);

        assert!(matches!(player.play(), Err(PlaybackError::PlaybackRejected(_))));
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn video_player_before_readiness_is_reported() {
        let (mut player, fakes) = player();
        fakes.embed_ready.set(false);
        player.load_playlist(vec![video("v")]).unwrap();

        assert_eq!(player.play(), Err(PlaybackError::NotReady));
        assert_eq!(player.state(), PlaybackState::Stopped);

        fakes.embed_ready.set(true);
        player.play().unwrap();
        fakes.embed_ready.set(false);

        assert_eq!(player.pause(), Err(PlaybackError::NotReady));
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn switching_tracks_releases_before_attaching() {
        let (mut player, fakes) = player();
        player.set_current_track(video("v")).unwrap();
        fakes.clear();

        player.set_current_track(local("a")).unwrap();

        assert_eq!(player.active_backend(), Some(BackendKind::Local));
        assert_eq!(
            fakes.calls(),
            vec!["release #1", "attach Local #2 a", "volume 75 #2"]
        );
    }

    #[test]
    fn set_current_track_follows_playlist_index() {
        let (mut player, _) = player();
        let tracks = locals(3);
        player.load_playlist(tracks.clone()).unwrap();

        player.set_current_track(tracks[2].clone()).unwrap();

        assert_eq!(player.current_index(), 2);
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn next_and_previous_keep_playing() {
        let (mut player, _) = player();
        player.load_playlist(locals(3)).unwrap();
        player.play().unwrap();

        player.next().unwrap();
        assert_eq!(player.current_index(), 1);
        assert_eq!(player.state(), PlaybackState::Playing);

        player.previous().unwrap();
        player.previous().unwrap();
        assert_eq!(player.current_index(), 2);
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn next_while_stopped_stays_stopped() {
        let (mut player, _) = player();
        player.load_playlist(locals(2)).unwrap();

        player.next().unwrap();

        assert_eq!(player.current_index(), 1);
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn next_on_single_track_is_a_no_op() {
        let (mut player, fakes) = player();
        player.load_playlist(locals(1)).unwrap();
        player.play().unwrap();
        player.seek(30.0).unwrap();
        fakes.clear();

        player.next().unwrap();
        player.previous().unwrap();

        assert_eq!(player.current_index(), 0);
        assert_eq!(player.current_time(), 30.0);
        assert!(fakes.calls().is_empty());
    }

    #[test]
    fn completion_with_repeat_restarts_track() {
        let (mut player, fakes) = player();
        player.load_playlist(locals(3)).unwrap();
        player.toggle_repeat();
        player.play().unwrap();
        player.seek(150.0).unwrap();
        fakes.clear();

        player.handle_completion().unwrap();

        assert_eq!(current_id(&player), Some("0"));
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(fakes.calls(), vec!["seek 0 #1", "play #1"]);
    }

    #[test]
    fn completion_of_single_track_stops() {
        let (mut player, _) = player();
        player.load_playlist(locals(1)).unwrap();
        player.play().unwrap();
        player.seek(199.0).unwrap();

        player.handle_completion().unwrap();

        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.current_time(), 0.0);
    }

    #[test]
    fn completion_of_last_track_wraps_around() {
        let (mut player, _) = player();
        player.load_playlist(vec![local("A"), local("B"), local("C")]).unwrap();
        player.select(2).unwrap();
        player.play().unwrap();

        player.handle_completion().unwrap();

        assert_eq!(current_id(&player), Some("A"));
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn completion_outside_playback_is_ignored() {
        let (mut player, _) = player();
        player.load_playlist(locals(2)).unwrap();

        player.handle_completion().unwrap();

        assert_eq!(player.current_index(), 0);
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn auto_advance_into_video_keeps_playing() {
        let (mut player, _) = player();
        player.load_playlist(vec![local("a"), video("v")]).unwrap();
        player.play().unwrap();

        player
            .handle_backend_event(BackendEvent::Finished { instance: 1 })
            .unwrap();

        assert_eq!(current_id(&player), Some("v"));
        assert_eq!(player.active_backend(), Some(BackendKind::Embedded));
        assert_eq!(player.state(), PlaybackState::Playing);
        assert!(player.wants_polling());
    }

    #[test]
    fn events_from_detached_backends_are_dropped() {
        let (mut player, _) = player();
        player.load_playlist(vec![video("v"), video("w")]).unwrap();
        player.play().unwrap();
        player.next().unwrap();

        // Instance 1 belonged to "v".
        player
            .handle_backend_event(BackendEvent::EmbedState { instance: 1, state: EmbedState::Ended })
            .unwrap();
        player
            .handle_backend_event(BackendEvent::TimeChanged { instance: 1, seconds: 12.0 })
            .unwrap();

        assert_eq!(current_id(&player), Some("w"));
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn local_backend_pushes_time_and_duration() {
        let (mut player, _) = player();
        player.load_playlist(vec![local("a")]).unwrap();

        player
            .handle_backend_event(BackendEvent::DurationChanged { instance: 1, seconds: 300.0 })
            .unwrap();
        player
            .handle_backend_event(BackendEvent::TimeChanged { instance: 1, seconds: 75.0 })
            .unwrap();

        assert_eq!(player.duration(), 300.0);
        assert_eq!(player.formatted_time(), "1:15");
        assert_eq!(player.formatted_duration(), "5:00");
        assert_eq!(player.progress(), 25.0);
    }

    #[test]
    fn native_rejection_stops_playback() {
        let (mut player, _) = player();
        player.load_playlist(vec![local("a")]).unwrap();
        player.play().unwrap();

        let result = player.handle_backend_event(BackendEvent::Rejected {
            instance: 1,
            reason: "cannot open file".into(),
        });

        assert_eq!(
            result,
            Err(PlaybackError::PlaybackRejected("cannot open file".into()))
        );
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn embed_state_codes_drive_playback_state() {
        let (mut player, _) = player();
        player.load_playlist(vec![video("v")]).unwrap();
        player.play().unwrap();

        player
            .handle_backend_event(BackendEvent::EmbedState { instance: 1, state: EmbedState::Paused })
            .unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);

        player
            .handle_backend_event(BackendEvent::EmbedState { instance: 1, state: EmbedState::Playing })
            .unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);

        player
            .handle_backend_event(BackendEvent::EmbedState { instance: 1, state: EmbedState::Paused })
            .unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);

        let result = player.handle_backend_event(BackendEvent::EmbedState {
            instance: 1,
            state: EmbedState::Error(150),
        });
        assert_eq!(
            result,
            Err(PlaybackError::EmbeddedPlayer(EmbedErrorKind::RestrictedEmbed))
        );
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn late_video_states_do_not_undo_stop() {
        let (mut player, _) = player();
        player.load_playlist(vec![video("v")]).unwrap();

        player.play().unwrap();
        player.stop().unwrap();

        for state in [EmbedState::Playing, EmbedState::Paused] {
            player
                .handle_backend_event(BackendEvent::EmbedState { instance: 1, state })
                .unwrap();
            assert_eq!(player.state(), PlaybackState::Stopped);
        }

        player.play().unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn embed_ready_updates_duration() {
        let (mut player, _) = player();
        player.load_playlist(vec![video("v")]).unwrap();

        player
            .handle_backend_event(BackendEvent::EmbedReady { instance: 1, duration: 212.0 })
            .unwrap();

        assert_eq!(player.duration(), 212.0);
    }

    #[test]
    fn polling_only_samples_playing_video() {
        let (mut player, fakes) = player();
        fakes.embed_time.set(61.0);
        fakes.embed_duration.set(122.0);
        player.load_playlist(vec![video("v")]).unwrap();

        player.poll_progress().unwrap();
        assert_eq!(player.current_time(), 0.0);
        assert!(!player.wants_polling());

        player.play().unwrap();
        player.poll_progress().unwrap();

        assert_eq!(player.current_time(), 61.0);
        assert_eq!(player.duration(), 122.0);
        assert_eq!(player.progress(), 50.0);
    }

    #[test]
    fn local_playback_is_never_polled() {
        let (mut player, _) = player();
        player.load_playlist(vec![local("a")]).unwrap();
        player.play().unwrap();

        assert!(!player.wants_polling());
    }

    #[test]
    fn volume_is_clamped_and_reapplied() {
        let (mut player, fakes) = player();
        player.set_volume(140).unwrap();
        assert_eq!(player.volume(), 100);

        player.adjust_volume(-130).unwrap();
        assert_eq!(player.volume(), 0);

        player.load_playlist(vec![local("a")]).unwrap();
        assert!(fakes.calls().contains(&"volume 0 #1".to_string()));
    }

    #[test]
    fn shuffle_visits_every_track_once_per_cycle() {
        let (mut player, _) = player();
        player.load_playlist(locals(8)).unwrap();
        player.toggle_shuffle();
        assert!(player.is_shuffling());

        let mut seen = HashSet::new();
        for _ in 0..8 {
            player.next().unwrap();
            seen.insert(player.current_index());
        }

        assert_eq!(seen.len(), 8);
        assert_eq!(player.current_index(), 0);
    }

    #[test]
    fn shutdown_releases_backend() {
        let (mut player, fakes) = player();
        player.load_playlist(vec![local("a")]).unwrap();
        player.play().unwrap();

        player.shutdown();

        assert_eq!(player.active_backend(), None);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(fakes.calls().last().map(String::as_str), Some("release #1"));
    }

    proptest! {
        #[test]
        fn next_cycles_through_every_index(len in 2usize..20, start in 0usize..20) {
            let start = start % len;
            let (mut player, _) = player();
            player.load_playlist_at(locals(len), start).unwrap();

            let mut visited = HashSet::new();
            for _ in 0..len {
                player.next().unwrap();
                prop_assert!(visited.insert(player.current_index()));
            }

            prop_assert_eq!(player.current_index(), start);
            prop_assert_eq!(visited.len(), len);
        }

        #[test]
        fn previous_undoes_next(len in 2usize..20, start in 0usize..20, shuffle: bool) {
            let start = start % len;
            let (mut player, _) = player();
            if shuffle {
                player.toggle_shuffle();
            }
            player.load_playlist_at(locals(len), start).unwrap();

            player.next().unwrap();
            player.previous().unwrap();

            prop_assert_eq!(player.current_index(), start);
        }

        #[test]
        fn seek_stores_clamped_time(target in -500.0f64..1000.0) {
            let (mut player, _) = player();
            player.load_playlist(vec![local("a")]).unwrap();

            player.seek(target).unwrap();

            prop_assert_eq!(player.current_time(), target.clamp(0.0, 200.0));
        }

        #[test]
        fn progress_tracks_time_over_duration(time in 0.0f64..200.0) {
            let (mut player, _) = player();
            player.load_playlist(vec![local("a")]).unwrap();
            player.seek(time).unwrap();

            prop_assert!((player.progress() - time / 200.0 * 100.0).abs() < 1e-9);
        }
    }
}
