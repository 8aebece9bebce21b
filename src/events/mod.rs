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

//! Application events and the main event loop.
//!
//! Every input to the application, key presses, ticks, backend notifications,
//! poller ticks and task results, arrives as an [`AppEvent`] on a single
//! channel. The loop applies them one at a time on the main thread, so the
//! player state is never mutated concurrently.
//!
//! After each event the progress poller is started or cancelled to match the
//! player state, and the frame is redrawn.

mod handlers;
mod key_handlers;

use handlers::*;
use key_handlers::process_key_event;

use std::io::Stdout;

use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{Terminal, prelude::CrosstermBackend};

use crate::{App, model::Song, player::BackendEvent, render::draw};

#[derive(Debug)]
pub(crate) enum AppEvent {
    Key(KeyEvent),

    Backend(BackendEvent),
    PollProgress,

    SongsLoaded(Vec<Song>),

    RemoveSelectedSong,
    SetVolume(i32),
    ToggleRepeat,
    ToggleShuffle,

    Tick,

    ExitApplication,

    Notice(String),
    Error(String),
    FatalError(String),
}

/// Runs the main application loop, handling events and rendering the UI in the
/// terminal.
///
/// This function loops until a quit event is received or the event channel
/// is closed.
///
/// # Errors
///
/// Returns an error on a fatal application error or if drawing fails.
pub(crate) fn process_events(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<()> {
    terminal.draw(|f| draw(f, app))?;

    while let Ok(event) = app.event_rx.recv() {
        match event {
            AppEvent::ExitApplication => break,
            AppEvent::FatalError(message) => anyhow::bail!(message),

            AppEvent::Key(key) => process_key_event(app, key)?,
            AppEvent::Backend(backend_event) => handle_backend_event(app, backend_event),
            AppEvent::PollProgress => handle_poll_progress(app),
            AppEvent::SongsLoaded(songs) => handle_songs_loaded(app, songs),
            AppEvent::RemoveSelectedSong => handle_remove_selected_song(app)?,
            AppEvent::SetVolume(volume) => handle_set_volume(app, volume),
            AppEvent::ToggleRepeat => handle_toggle_repeat(app),
            AppEvent::ToggleShuffle => handle_toggle_shuffle(app),
            AppEvent::Notice(text) => handle_notice(app, text),
            AppEvent::Error(text) => handle_error(app, text),
            AppEvent::Tick => {}
        }

        after_event(app)?;

        terminal.draw(|f| draw(f, app))?;
    }

    Ok(())
}
