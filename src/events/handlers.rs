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

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    App, StatusMessage,
    error::PlaybackError,
    model::Song,
    player::{BackendEvent, PlaybackState},
    tasks::AppTask,
};

/// Reports the outcome of a player action on the status line.
pub(super) fn report(app: &mut App, result: Result<(), PlaybackError>) {
    if let Err(e) = result {
        warn!(error = %e, state = ?app.player.state(), "Playback action failed");
        app.status = Some(StatusMessage::error(e.to_string()));
    }
}

pub(super) fn handle_backend_event(app: &mut App, event: BackendEvent) {
    match event {
        BackendEvent::EmbedApiReady => {
            if app.embed_api.signal_ready() {
                info!("Video playback ready");
                app.status = Some(StatusMessage::notice("Video playback ready"));
            }
        }
        BackendEvent::EmbedApiFailed(reason) => {
            app.status = Some(StatusMessage::error(format!(
                "Video playback unavailable: {}",
                reason
            )));
        }
        event => {
            let result = app.player.handle_backend_event(event);
            report(app, result);
        }
    }
}

pub(super) fn handle_poll_progress(app: &mut App) {
    let result = app.player.poll_progress();
    report(app, result);
}

/// Shows the library. The first time songs arrive they also become the
/// playlist, after that the playlist only changes when a song is selected.
pub(super) fn handle_songs_loaded(app: &mut App, songs: Vec<Song>) {
    info!(count = songs.len(), "Library loaded");

    if app.player.current_track().is_none() {
        let tracks = songs.iter().map(Song::to_track).collect();
        let result = app.player.load_playlist(tracks);
        report(app, result);
    }

    app.song_table.set_songs(songs);
}

/// Makes the song at `index` current. Playback is not started.
/// When the table still matches the playlist only the index moves.
pub(super) fn handle_select_song(app: &mut App, index: usize) {
    let in_sync = app.player.playlist().len() == app.song_table.songs.len()
        && app
            .player
            .playlist()
            .iter()
            .zip(&app.song_table.songs)
            .all(|(track, song)| track.id == song.id);

    let result = if in_sync {
        app.player.select(index)
    } else {
        let tracks = app.song_table.songs.iter().map(Song::to_track).collect();
        app.player.load_playlist_at(tracks, index)
    };
    report(app, result);

    if let Some(track) = app.player.current_track() {
        if !track.is_playable {
            app.status = Some(StatusMessage::error(format!(
                "\"{}\" has no playable source",
                track.title
            )));
        }
    }
}

pub(super) fn handle_remove_selected_song(app: &mut App) -> Result<()> {
    if let Some(song) = app.song_table.selected_song() {
        app.task_tx.send(AppTask::RemoveSong(song.id.clone()))?;
    }

    Ok(())
}

pub(super) fn handle_set_volume(app: &mut App, volume: i32) {
    let result = app.player.set_volume(volume);
    report(app, result);
}

pub(super) fn handle_toggle_repeat(app: &mut App) {
    app.player.toggle_repeat();
}

pub(super) fn handle_toggle_shuffle(app: &mut App) {
    app.player.toggle_shuffle();
}

pub(super) fn handle_notice(app: &mut App, text: String) {
    app.status = Some(StatusMessage::notice(text));
}

pub(super) fn handle_error(app: &mut App, text: String) {
    warn!(error = %text, "Reported error");
    app.status = Some(StatusMessage::error(text));
}

/// Keeps the poller in step with the player and counts plays.
pub(super) fn after_event(app: &mut App) -> Result<()> {
    app.poller.sync(app.player.wants_polling());

    if app.player.state() == PlaybackState::Playing {
        if let Some(track) = app.player.current_track() {
            if app.recorded_play.as_deref() != Some(track.id.as_str()) {
                app.recorded_play = Some(track.id.clone());
                app.task_tx.send(AppTask::RecordPlay(track.id.clone()))?;
            }
        }
    }

    Ok(())
}
