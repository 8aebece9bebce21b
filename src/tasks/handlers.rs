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

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::{
    db::{self, samples, scan},
    events::AppEvent,
    tasks::TaskContext,
};

pub(super) fn load_songs(ctx: &mut TaskContext) -> Result<()> {
    let songs = db::fetch_songs(ctx.conn)?;
    ctx.event_tx.send(AppEvent::SongsLoaded(songs))?;

    Ok(())
}

pub(super) fn add_youtube_song(
    ctx: &mut TaskContext,
    url: &str,
    title: &str,
    artist: Option<&str>,
) -> Result<()> {
    let song = db::add_youtube_song(ctx.conn, url, title, artist)?;
    info!(id = %song.id, url, "YouTube link registered");

    ctx.event_tx
        .send(AppEvent::Notice(format!("Added \"{}\"", song.title)))?;

    load_songs(ctx)
}

pub(super) fn import_media_dirs(ctx: &mut TaskContext) -> Result<()> {
    if ctx.config.media_dirs.is_empty() {
        ctx.event_tx.send(AppEvent::Notice(
            "No media directories configured".to_string(),
        ))?;
        return Ok(());
    }

    let added = scan::import_media_dirs(ctx.conn, &ctx.config.media_dirs)?;
    ctx.event_tx
        .send(AppEvent::Notice(format!("Imported {} new songs", added)))?;

    load_songs(ctx)
}

pub(super) fn add_sample_songs(ctx: &mut TaskContext) -> Result<()> {
    let added = samples::add_sample_songs(ctx.conn, Path::new(&ctx.config.samples_dir))?;
    ctx.event_tx
        .send(AppEvent::Notice(format!("Added {} sample songs", added)))?;

    load_songs(ctx)
}

pub(super) fn remove_song(ctx: &mut TaskContext, id: &str) -> Result<()> {
    if db::delete_song(ctx.conn, id)? {
        info!(id, "Song removed");
    }

    load_songs(ctx)
}

/// Counts a play and refreshes the library so the new count is shown.
pub(super) fn record_play(ctx: &mut TaskContext, id: &str) -> Result<()> {
    db::increment_play_count(ctx.conn, id)?;

    load_songs(ctx)
}
