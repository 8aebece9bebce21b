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

//! Asynchronous application task processing.
//!
//! This module offloads song library operations from the main UI thread. A
//! dedicated worker owns the database connection, translates [`AppTask`]
//! requests into database operations and broadcasts the results back to the
//! application via [`AppEvent`]s.
//!
//! Only actions that may block, or may take more than a trivial amount of time
//! to process, should be implemented as tasks. Other actions are likely more
//! suited to events.

mod handlers;

use anyhow::Result;
use rusqlite::Connection;
use std::{
    sync::mpsc::{Receiver, Sender},
    thread,
};
use tracing::{error, warn};

use crate::{config::AppConfig, db, events::AppEvent};

#[derive(Debug)]
pub(crate) enum AppTask {
    LoadSongs,

    AddYoutubeSong {
        url: String,
        title: String,
        artist: Option<String>,
    },

    ImportMediaDirs,

    AddSampleSongs,

    RemoveSong(String),

    RecordPlay(String),
}

/// Spawns a background thread to process application tasks.
///
/// This worker thread initializes its own database connection and enters
/// a blocking loop, listening for incoming [`AppTask`]s. A database that
/// cannot be opened is fatal.
pub(crate) fn spawn_task_worker(
    config: &AppConfig,
    task_rx: Receiver<AppTask>,
    event_tx: Sender<AppEvent>,
) {
    let config = config.clone();

    thread::spawn(move || {
        let mut conn = match db::init_db(&config.database_file) {
            Ok(conn) => conn,
            Err(e) => {
                error!(error = ?e, file = %config.database_file, "Database unavailable");
                let _ = event_tx.send(AppEvent::FatalError(format!(
                    "Failed to initialise database: {:#}",
                    e
                )));
                return;
            }
        };

        while let Ok(task) = task_rx.recv() {
            let mut ctx = TaskContext {
                config: &config,
                event_tx: &event_tx,
                conn: &mut conn,
            };

            if let Err(e) = handle_task(task, &mut ctx) {
                warn!(error = ?e, "Task failed");
                let _ = event_tx.send(AppEvent::Error(format!("{:#}", e)));
            }
        }
    });
}

/// Bundles shared resources required by task handlers to simplify resource
/// passing when invoking those handler functions.
pub(crate) struct TaskContext<'a> {
    config: &'a AppConfig,
    event_tx: &'a Sender<AppEvent>,
    conn: &'a mut Connection,
}

fn handle_task(task: AppTask, ctx: &mut TaskContext) -> Result<()> {
    match task {
        AppTask::LoadSongs => handlers::load_songs(ctx),
        AppTask::AddYoutubeSong { url, title, artist } => {
            handlers::add_youtube_song(ctx, &url, &title, artist.as_deref())
        }
        AppTask::ImportMediaDirs => handlers::import_media_dirs(ctx),
        AppTask::AddSampleSongs => handlers::add_sample_songs(ctx),
        AppTask::RemoveSong(id) => handlers::remove_song(ctx, &id),
        AppTask::RecordPlay(id) => handlers::record_play(ctx, &id),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    struct Harness {
        config: AppConfig,
        conn: Connection,
        event_tx: Sender<AppEvent>,
        event_rx: Receiver<AppEvent>,
    }

    impl Harness {
        fn new() -> Self {
            let conn = Connection::open_in_memory().unwrap();
            db::create_schema(&conn).unwrap();
            let (event_tx, event_rx) = mpsc::channel();
            Self {
                config: AppConfig::default(),
                conn,
                event_tx,
                event_rx,
            }
        }

        fn run(&mut self, task: AppTask) -> Result<()> {
            let mut ctx = TaskContext {
                config: &self.config,
                event_tx: &self.event_tx,
                conn: &mut self.conn,
            };
            handle_task(task, &mut ctx)
        }

        fn events(&self) -> Vec<AppEvent> {
            self.event_rx.try_iter().collect()
        }
    }

    #[test]
    fn adding_a_link_reloads_the_library() {
        let mut harness = Harness::new();

        harness
            .run(AppTask::AddYoutubeSong {
                url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                title: "Never Gonna Give You Up".to_string(),
                artist: None,
            })
            .unwrap();

        let events = harness.events();
        assert!(events.iter().any(|e| matches!(e, AppEvent::Notice(_))));
        assert!(events.iter().any(
            |e| matches!(e, AppEvent::SongsLoaded(songs) if songs.len() == 1 && songs[0].title == "Never Gonna Give You Up")
        ));
    }

    #[test]
    fn invalid_link_is_an_error() {
        let mut harness = Harness::new();

        let result = harness.run(AppTask::AddYoutubeSong {
            url: "https://example.com".to_string(),
            title: "x".to_string(),
            artist: None,
        });

        assert!(result.is_err());
        assert!(harness.events().is_empty());
    }

    #[test]
    fn recording_a_play_refreshes_the_count() {
        let mut harness = Harness::new();
        let song = db::add_youtube_song(&harness.conn, "https://youtu.be/dQw4w9WgXcQ", "t", None)
            .unwrap();

        harness.run(AppTask::RecordPlay(song.id.clone())).unwrap();

        assert!(harness.events().iter().any(|e| matches!(
            e,
            AppEvent::SongsLoaded(songs) if songs.len() == 1 && songs[0].play_count == 1
        )));
    }

    #[test]
    fn sample_songs_are_added_to_the_library() {
        let dir = tempfile::tempdir().unwrap();
        let mut harness = Harness::new();
        harness.config.samples_dir = dir.path().to_string_lossy().to_string();

        harness.run(AppTask::AddSampleSongs).unwrap();

        let events = harness.events();
        assert!(events.iter().any(|e| matches!(e, AppEvent::Notice(_))));
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::SongsLoaded(songs) if songs.len() == 2
        )));
    }

    #[test]
    fn removing_a_song_reloads_the_library() {
        let mut harness = Harness::new();
        let song = db::add_youtube_song(&harness.conn, "https://youtu.be/dQw4w9WgXcQ", "t", None)
            .unwrap();

        harness.run(AppTask::RemoveSong(song.id)).unwrap();

        assert!(harness
            .events()
            .iter()
            .any(|e| matches!(e, AppEvent::SongsLoaded(songs) if songs.is_empty())));
    }
}
