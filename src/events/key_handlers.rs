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
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

use crate::{
    App,
    components::SongTableAction,
    events::{
        AppEvent,
        handlers::{handle_select_song, report},
    },
};

const VOLUME_DELTA: i32 = 5;

const SEEK_DELTA: f64 = 10.0;

/// Maps keyboard input to application actions and playback commands.
///
/// The command line gets the first look at a key, then the song table, and
/// whatever neither of them consumed is a global shortcut.
///
/// # Errors
///
/// Returns an error if a command fails to send to a background worker.
pub(super) fn process_key_event(app: &mut App, key: KeyEvent) -> Result<()> {
    if key.kind != KeyEventKind::Press {
        return Ok(());
    }

    let event = Event::Key(key);
    if app
        .commander
        .handle_event(&event, &app.task_tx, &app.event_tx)?
    {
        return Ok(());
    }

    if let Some(SongTableAction::Activate(index)) = app.song_table.process_event(&event) {
        handle_select_song(app, index);
        return Ok(());
    }

    process_global_key_event(app, key)
}

fn process_global_key_event(app: &mut App, key: KeyEvent) -> Result<()> {
    let result = match key.code {
        KeyCode::Char('q') => {
            app.event_tx.send(AppEvent::ExitApplication)?;
            Ok(())
        }

        KeyCode::Char(' ') => app.player.toggle_play_pause(),
        KeyCode::Char('s') => app.player.stop(),
        KeyCode::Char('h') | KeyCode::Left => app.player.previous(),
        KeyCode::Char('l') | KeyCode::Right => app.player.next(),

        KeyCode::Char(',') => app.player.seek_by(-SEEK_DELTA),
        KeyCode::Char('.') => app.player.seek_by(SEEK_DELTA),

        KeyCode::Char('-') => app.player.adjust_volume(-VOLUME_DELTA),
        KeyCode::Char('=') => app.player.adjust_volume(VOLUME_DELTA),

        KeyCode::Char('r') => {
            app.player.toggle_repeat();
            Ok(())
        }
        KeyCode::Char('z') => {
            app.player.toggle_shuffle();
            Ok(())
        }

        _ => Ok(()),
    };

    report(app, result);

    Ok(())
}
