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

//! Interactive song table widget and state management.
//!
//! The table lists the song library in the same order as the player's
//! playlist, so a row index is also a playlist index.

mod event;
mod render;

use ratatui::widgets::TableState;

use crate::model::Song;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SongTableAction {
    /// Enter was pressed on a row.
    Activate(usize),
}

pub(crate) struct SongTable {
    pub(crate) songs: Vec<Song>,
    pub(crate) table_state: TableState,
}

impl SongTable {
    pub(crate) fn new() -> Self {
        Self {
            songs: vec![],
            table_state: TableState::new(),
        }
    }

    /// Replaces the rows, keeping the cursor on the same song if it is still
    /// listed.
    pub(crate) fn set_songs(&mut self, songs: Vec<Song>) {
        let selected_id = self.selected_song().map(|s| s.id.clone());
        self.songs = songs;

        let index = selected_id
            .and_then(|id| self.songs.iter().position(|s| s.id == id))
            .or_else(|| (!self.songs.is_empty()).then_some(0));
        self.table_state.select(index);
    }

    pub(crate) fn selected_index(&self) -> Option<usize> {
        self.table_state
            .selected()
            .filter(|i| *i < self.songs.len())
    }

    pub(crate) fn selected_song(&self) -> Option<&Song> {
        self.selected_index().and_then(|i| self.songs.get(i))
    }

    fn goto_next(&mut self) {
        let len = self.songs.len();
        if len == 0 { return; }
        let i = match self.table_state.selected() {
            Some(i) => if i >= len - 1 { 0 } else { i + 1 },
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn goto_previous(&mut self) {
        let len = self.songs.len();
        if len == 0 { return; }
        let i = match self.table_state.selected() {
            Some(i) => if i == 0 { len - 1 } else { i - 1 },
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn goto_first(&mut self) {
        if !self.songs.is_empty() {
            self.table_state.select(Some(0));
        }
    }

    fn goto_last(&mut self) {
        if !self.songs.is_empty() {
            self.table_state.select(Some(self.songs.len() - 1));
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

    use super::*;
    use crate::model::{SourceKind, tests::song};

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn table(n: usize) -> SongTable {
        let mut table = SongTable::new();
        table.set_songs((0..n).map(|i| song(&i.to_string(), SourceKind::Upload)).collect());
        table
    }

    #[test]
    fn navigation_wraps() {
        let mut table = table(3);
        assert_eq!(table.selected_index(), Some(0));

        table.process_event(&key(KeyCode::Char('k')));
        assert_eq!(table.selected_index(), Some(2));

        table.process_event(&key(KeyCode::Char('j')));
        assert_eq!(table.selected_index(), Some(0));

        table.process_event(&key(KeyCode::Char('G')));
        assert_eq!(table.selected_index(), Some(2));
    }

    #[test]
    fn enter_activates_the_cursor_row() {
        let mut table = table(3);
        table.process_event(&key(KeyCode::Down));

        assert_eq!(
            table.process_event(&key(KeyCode::Enter)),
            Some(SongTableAction::Activate(1))
        );
        assert_eq!(table.process_event(&key(KeyCode::Char('x'))), None);
    }

    #[test]
    fn reload_keeps_the_cursor_on_its_song() {
        let mut table = table(3);
        table.process_event(&key(KeyCode::Char('G')));

        let mut songs = table.songs.clone();
        songs.insert(0, song("new", SourceKind::Youtube));
        table.set_songs(songs);

        assert_eq!(table.selected_song().map(|s| s.id.as_str()), Some("2"));
        assert_eq!(table.selected_index(), Some(3));
    }

    #[test]
    fn empty_table_has_no_selection() {
        let mut table = table(0);
        table.process_event(&key(KeyCode::Char('j')));

        assert_eq!(table.selected_index(), None);
        assert_eq!(table.process_event(&key(KeyCode::Enter)), None);
    }
}
