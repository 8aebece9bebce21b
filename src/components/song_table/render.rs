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

//! UI rendering logic for the song table.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Cell, Row, Table},
};

use crate::{
    components::SongTable,
    model::{DEFAULT_DURATION_SECS, SourceKind},
    theme::Theme,
    util::format::format_time,
};

impl SongTable {
    /// Draws the table, marking the row of the song being played.
    pub(crate) fn draw(&mut self, f: &mut Frame, area: Rect, theme: &Theme, now_playing: Option<&str>) {
        let rows = self.songs.iter().map(|song| {
            let playing = now_playing == Some(song.id.as_str());
            let indicator = if playing {
                Line::from(">").style(Style::default().fg(Color::Black).bg(theme.accent_colour))
            } else {
                Line::from("")
            };

            let seconds = song
                .duration_seconds
                .and_then(|s| u64::try_from(s).ok())
                .unwrap_or(DEFAULT_DURATION_SECS);

            let source = match song.source {
                SourceKind::Youtube => "yt",
                SourceKind::Upload => "file",
                SourceKind::Sample => "demo",
            };

            Row::new(vec![
                Cell::from(indicator),
                Cell::from(Line::from(format_time(seconds as f64)).style(Style::default().fg(theme.table_time_fg)).alignment(Alignment::Right)),
                Cell::from(Line::from(source).style(Style::default().fg(theme.table_source_fg))),
                Cell::from(Line::from(song.artist.as_deref().unwrap_or("")).style(Style::default().fg(theme.table_artist_fg))),
                Cell::from(Line::from(song.album.as_deref().unwrap_or("")).style(Style::default().fg(theme.table_album_fg))),
                Cell::from(Line::from(song.title.as_str()).style(Style::default().fg(theme.table_title_fg))),
                Cell::from(Line::from(song.play_count.to_string()).style(Style::default().fg(theme.table_time_fg)).alignment(Alignment::Right)),
            ])
        });

        let table = Table::new(
            rows,
            [
                Constraint::Length(1),
                Constraint::Length(6),
                Constraint::Length(4),
                Constraint::Percentage(20),
                Constraint::Percentage(25),
                Constraint::Percentage(55),
                Constraint::Length(5),
            ],
        )
        .header(
            Row::new(vec![
                Cell::from(""),
                Cell::from(Line::from("Time").alignment(Alignment::Right)),
                Cell::from(""),
                Cell::from("Artist"),
                Cell::from("Album"),
                Cell::from("Title"),
                Cell::from(Line::from("Plays").alignment(Alignment::Right)),
            ])
            .style(Style::default().bold().fg(theme.accent_colour))
            .bottom_margin(1),
        )
        .row_highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .block(Block::default());

        f.render_stateful_widget(table, area, &mut self.table_state);
    }
}
