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

//! Render the music player panel.
//!
//! Shows the current track, playback state, time, progress, volume and the
//! shuffle and repeat modes.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Padding, Paragraph},
};

use crate::{
    App,
    player::{BackendKind, PlaybackState},
    render::icons::{ICON_PAUSE, ICON_PLAY, ICON_REPEAT, ICON_SHUFFLE, ICON_STOP},
    util::format::format_time,
};

/// Renders the main player widget including track info and controls.
pub(crate) fn draw_player(f: &mut Frame, area: Rect, app: &App) {
    let player = &app.player;
    let theme = &app.theme;

    let block = Block::default()
        .borders(Borders::TOP | Borders::BOTTOM)
        .border_style(Style::default().fg(theme.border_colour))
        .padding(Padding::horizontal(1));

    let inner_area = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner_area);

    let info_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(30)])
        .split(chunks[0]);

    let bold = Style::default().add_modifier(Modifier::BOLD);

    if let Some(track) = player.current_track() {
        let icon = match player.state() {
            PlaybackState::Playing => ICON_PLAY,
            PlaybackState::Paused => ICON_PAUSE,
            PlaybackState::Stopped => ICON_STOP,
        };

        let track_line = Line::from(vec![
            Span::styled(format!(" {} ", icon), bold).fg(Color::White),
            Span::styled(track.title.as_str(), bold).fg(theme.accent_colour),
            Span::raw(" from "),
            Span::styled(track.album.as_str(), bold).fg(theme.accent_colour),
            Span::raw(" by "),
            Span::styled(track.artist.as_str(), bold).fg(theme.accent_colour),
        ]);
        f.render_widget(Paragraph::new(track_line), info_chunks[0]);

        let remaining = format_time(player.duration() - player.current_time());

        let time_line = Line::from(vec![
            Span::styled(player.formatted_time(), bold).fg(theme.accent_colour),
            Span::styled(" / ", bold).fg(Color::White),
            Span::styled(player.formatted_duration(), bold).fg(theme.accent_colour),
            Span::styled(" (-", bold).fg(Color::White),
            Span::styled(remaining, bold).fg(theme.accent_colour),
            Span::styled(")", bold).fg(Color::White),
        ]);

        f.render_widget(
            Paragraph::new(time_line).alignment(Alignment::Right),
            info_chunks[1],
        );
    } else {
        f.render_widget(
            Paragraph::new(" No song selected").fg(theme.notice_colour),
            info_chunks[0],
        );
    }

    let control_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(26)])
        .split(chunks[2]);

    let mode_style = |on: bool| {
        if on {
            Style::default().fg(theme.accent_colour)
        } else {
            Style::default().fg(theme.border_colour)
        }
    };
    let source = match player.active_backend() {
        Some(BackendKind::Embedded) => "YouTube",
        Some(BackendKind::Local) => "Local",
        None => "",
    };
    let position_label = if player.playlist().is_empty() {
        String::new()
    } else {
        format!(" {}/{} ", player.current_index() + 1, player.playlist().len())
    };
    let modes = Line::from(vec![
        Span::styled(position_label, Style::default().fg(Color::White)),
        Span::styled(format!(" {} shuffle", ICON_SHUFFLE), mode_style(player.is_shuffling())),
        Span::raw("  "),
        Span::styled(format!("{} repeat", ICON_REPEAT), mode_style(player.is_repeating())),
        Span::raw("  "),
        Span::styled(source, Style::default().fg(theme.notice_colour)),
    ]);
    f.render_widget(Paragraph::new(modes), control_chunks[0]);

    let volume_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(5)])
        .split(control_chunks[1]);

    let vol_ratio = (f64::from(player.volume()) / 100.0).clamp(0.0, 1.0);

    let volume_gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.accent_colour).bg(theme.gauge_track_colour))
        .ratio(vol_ratio)
        .label("")
        .use_unicode(true);
    f.render_widget(volume_gauge, volume_layout[0]);

    let volume_label = Paragraph::new(format!(" {}%", player.volume()))
        .alignment(Alignment::Right)
        .fg(Color::White);
    f.render_widget(volume_label, volume_layout[1]);

    let position = (player.progress() / 100.0).clamp(0.0, 1.0);

    let position_gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(theme.accent_colour)
                .bg(theme.gauge_track_colour),
        )
        .ratio(position)
        .label("")
        .use_unicode(true);

    f.render_widget(position_gauge, chunks[4]);
}
