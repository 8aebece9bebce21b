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

//! MPV-backed local audio engine.
//!
//! A single long-lived worker thread owns the `libmpv` context. Every track
//! played through it gets a lightweight [`LocalTrack`] handle carrying its own
//! instance id, so that commands from, and events for, a track that has since
//! been replaced can be told apart.
//!
//! # Architecture
//!
//! The engine uses the same dual-channel pattern as the rest of the
//! application:
//! 1. **Command Channel**: receives [`LocalCommand`]s from track handles.
//! 2. **Event Channel**: pushes [`BackendEvent`]s (time, duration, end of file,
//!    load failures) to the event loop.

use anyhow::{Context, Result};
use mpv::Format;
use std::{
    sync::{
        Arc, Mutex,
        mpsc::{self, Receiver, Sender},
    },
    thread,
};
use tracing::{debug, error, warn};

use crate::{
    error::PlaybackError,
    events::AppEvent,
    player::{
        BackendEvent, BackendKind, MediaBackend, Progress, SharedProgress,
        engine::{EngineFile, SeekPlan},
        read_progress,
    },
};

#[derive(Debug)]
pub(crate) enum LocalCommand {
    Load { instance: u64, url: String },
    Play { instance: u64 },
    Pause { instance: u64 },
    Stop { instance: u64 },
    Seek { instance: u64, seconds: f64 },
    Volume(u8),
    Unload { instance: u64 },
    Shutdown,
}

/// Owner of the local audio worker.
pub(crate) struct LocalAudio {
    command_tx: Sender<LocalCommand>,
    progress: SharedProgress,
}

impl LocalAudio {
    /// Spawns the audio worker thread.
    ///
    /// If the worker fails to start, or dies later on, this is broadcast as a
    /// fatal application event.
    pub(crate) fn spawn(event_tx: Sender<AppEvent>) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let progress: SharedProgress = Arc::new(Mutex::new(Progress::default()));

        let worker_progress = Arc::clone(&progress);
        let error_tx = event_tx.clone();

        thread::spawn(move || {
            if let Err(e) = local_audio_worker(command_rx, event_tx, worker_progress) {
                error!(error = ?e, "Local audio worker failed");
                let _ = error_tx.send(AppEvent::FatalError(format!("MPV worker failure: {:?}", e)));
            }
        });

        Self { command_tx, progress }
    }

    /// Loads `url` paused and returns the handle controlling it.
    pub(crate) fn attach(&self, instance: u64, url: &str) -> Result<LocalTrack, PlaybackError> {
        let track = LocalTrack {
            instance,
            command_tx: self.command_tx.clone(),
            progress: Arc::clone(&self.progress),
            released: false,
        };

        track.send(LocalCommand::Load {
            instance,
            url: url.to_string(),
        })?;

        Ok(track)
    }
}

impl Drop for LocalAudio {
    fn drop(&mut self) {
        let _ = self.command_tx.send(LocalCommand::Shutdown);
    }
}

/// Handle on one track loaded into the local audio engine.
pub(crate) struct LocalTrack {
    instance: u64,
    command_tx: Sender<LocalCommand>,
    progress: SharedProgress,
    released: bool,
}

impl LocalTrack {
    fn send(&self, command: LocalCommand) -> Result<(), PlaybackError> {
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::BackendUnavailable("audio engine has stopped".into()))
    }
}

impl MediaBackend for LocalTrack {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn instance(&self) -> u64 {
        self.instance
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.send(LocalCommand::Play { instance: self.instance })
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.send(LocalCommand::Pause { instance: self.instance })
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.send(LocalCommand::Stop { instance: self.instance })
    }

    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.send(LocalCommand::Seek {
            instance: self.instance,
            seconds,
        })
    }

    fn current_time(&self) -> Result<f64, PlaybackError> {
        read_progress(&self.progress, self.instance).map(|p| p.time)
    }

    fn duration(&self) -> Result<f64, PlaybackError> {
        read_progress(&self.progress, self.instance).map(|p| p.duration)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError> {
        self.send(LocalCommand::Volume(volume))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            let _ = self.send(LocalCommand::Unload { instance: self.instance });
        }
    }
}

impl Drop for LocalTrack {
    fn drop(&mut self) {
        self.release();
    }
}

/// What the worker knows about the track currently loaded.
#[derive(Default)]
struct Loaded {
    instance: Option<u64>,
    url: Option<String>,
    file: EngineFile,
}

impl Loaded {
    fn is(&self, instance: u64) -> bool {
        self.instance == Some(instance)
    }
}

/// The execution loop for the local audio engine.
///
/// # Errors
///
/// Returns an error if the MPV context fails to initialize or if the event
/// channel has been closed.
fn local_audio_worker(
    command_rx: Receiver<LocalCommand>,
    event_tx: Sender<AppEvent>,
    progress: SharedProgress,
) -> Result<()> {
    let mut handler = (|| {
        let mut builder = mpv::MpvHandlerBuilder::new().context("Failed to create MPV builder")?;
        builder
            .set_option("vo", "null")
            .context("Failed to set no video output")?;
        builder.build().context("Failed to build MPV handler")
    })()?;

    handler
        .observe_property::<f64>("duration", 0)
        .context("Failed to observe duration")?;
    handler
        .observe_property::<f64>("time-pos", 0)
        .context("Failed to observe time-pos")?;
    handler
        .observe_property::<bool>("idle-active", 0)
        .context("Failed to observe idle-active")?;

    let mut loaded = Loaded::default();

    loop {
        if !process_commands(&mut handler, &command_rx, &mut loaded, &event_tx)? {
            debug!("Local audio worker shutting down");
            return Ok(());
        }
        process_mpv_events(&mut handler, &mut loaded, &progress, &event_tx)?;
    }
}

/// Drains and executes all pending commands.
///
/// Returns `false` once the engine should shut down.
fn process_commands(
    handler: &mut mpv::MpvHandler,
    command_rx: &Receiver<LocalCommand>,
    loaded: &mut Loaded,
    event_tx: &Sender<AppEvent>,
) -> Result<bool> {
    loop {
        let command = match command_rx.try_recv() {
            Ok(command) => command,
            Err(mpsc::TryRecvError::Empty) => return Ok(true),
            Err(mpsc::TryRecvError::Disconnected) => return Ok(false),
        };

        let (instance, result) = match command {
            LocalCommand::Load { instance, url } => {
                loaded.instance = Some(instance);
                loaded.url = Some(url.clone());
                loaded.file.replace();
                (Some(instance), load_paused(handler, &url))
            }
            LocalCommand::Play { instance } if loaded.is(instance) => {
                let reload = match loaded.url.as_deref() {
                    Some(url) if loaded.file.needs_reload() => {
                        loaded.file.loading();
                        Some(load_paused(handler, url))
                    }
                    _ => None,
                };
                let result = match reload {
                    Some(Err(e)) => Err(e),
                    _ => handler
                        .set_property("pause", false)
                        .context("Failed to unpause"),
                };
                (Some(instance), result)
            }
            LocalCommand::Pause { instance } if loaded.is(instance) => (
                Some(instance),
                handler.set_property("pause", true).context("Failed to pause"),
            ),
            LocalCommand::Stop { instance } if loaded.is(instance) => {
                let result = handler.set_property("pause", true).context("Failed to pause");
                loaded.file.stop();
                if loaded.file.is_loaded() {
                    // Rewinding fails harmlessly when nothing has been decoded
                    // yet.
                    if let Err(e) = handler.command(&["seek", "0", "absolute"]) {
                        debug!(error = ?e, "Rewind on stop failed");
                    }
                }
                (Some(instance), result)
            }
            LocalCommand::Seek { instance, seconds } if loaded.is(instance) => {
                let result = match loaded.file.seek(seconds) {
                    SeekPlan::Now => handler
                        .command(&["seek", &seconds.to_string(), "absolute"])
                        .context("Failed to seek"),
                    SeekPlan::Deferred => {
                        debug!(instance, seconds, "Seek deferred until the file is loaded");
                        Ok(())
                    }
                };
                (Some(instance), result)
            }
            LocalCommand::Volume(volume) => (
                loaded.instance,
                handler
                    .set_property("volume", f64::from(volume))
                    .context("Failed to set volume"),
            ),
            LocalCommand::Unload { instance } if loaded.is(instance) => {
                loaded.instance = None;
                loaded.url = None;
                (None, handler.command(&["stop"]).context("Failed to stop"))
            }
            LocalCommand::Shutdown => return Ok(false),
            stale => {
                debug!(command = ?stale, "Ignoring command for unloaded track");
                (None, Ok(()))
            }
        };

        if let Err(e) = result {
            warn!(error = ?e, "Audio command failed");
            if let Some(instance) = instance {
                event_tx
                    .send(AppEvent::Backend(BackendEvent::Rejected {
                        instance,
                        reason: format!("{:#}", e),
                    }))
                    .context("Failed to send rejection event")?;
            }
        }
    }
}

fn load_paused(handler: &mut mpv::MpvHandler, url: &str) -> Result<()> {
    handler
        .set_property("pause", true)
        .context("Failed to pause before load")?;
    handler
        .command(&["loadfile", url, "replace"])
        .context(format!("Failed to load file: {}", url))
}

/// Polls for MPV events and pushes them to the event loop tagged with the
/// loaded instance.
///
/// This function waits for up to 50ms for an event from the MPV context.
fn process_mpv_events(
    handler: &mut mpv::MpvHandler,
    loaded: &mut Loaded,
    progress: &SharedProgress,
    event_tx: &Sender<AppEvent>,
) -> Result<()> {
    let Some(mpv_event) = handler.wait_event(0.05) else {
        return Ok(());
    };

    if let mpv::Event::PropertyChange {
        name: "idle-active",
        change: Format::Flag(idle_active),
        ..
    } = mpv_event
    {
        loaded.file.set_idle(idle_active);
        return Ok(());
    }

    match mpv_event {
        mpv::Event::FileLoaded => {
            if let Some(seconds) = loaded.file.loaded() {
                if let Err(e) = handler.command(&["seek", &seconds.to_string(), "absolute"]) {
                    debug!(error = ?e, seconds, "Deferred seek failed");
                }
            }
            return Ok(());
        }
        // The file is gone before idle-active says so.
        mpv::Event::EndFile(Ok(mpv::EndFileReason::MPV_END_FILE_REASON_EOF))
        | mpv::Event::EndFile(Err(_)) => loaded.file.set_idle(true),
        _ => {}
    }

    let Some(instance) = loaded.instance else {
        return Ok(());
    };

    let backend_event = match mpv_event {
        mpv::Event::PropertyChange { name, change, .. } => match (name, change) {
            ("duration", Format::Double(seconds)) => {
                update_progress(progress, instance, |p| p.duration = seconds);
                Some(BackendEvent::DurationChanged { instance, seconds })
            }
            ("time-pos", Format::Double(seconds)) if seconds >= 0.0 => {
                update_progress(progress, instance, |p| p.time = seconds);
                Some(BackendEvent::TimeChanged { instance, seconds })
            }
            _ => None,
        },
        mpv::Event::EndFile(Ok(mpv::EndFileReason::MPV_END_FILE_REASON_EOF)) => {
            Some(BackendEvent::Finished { instance })
        }
        mpv::Event::EndFile(Err(e)) => Some(BackendEvent::Rejected {
            instance,
            reason: format!("{:?}", e),
        }),
        _ => None,
    };

    if let Some(event) = backend_event {
        event_tx
            .send(AppEvent::Backend(event))
            .context("Failed to send event")?;
    }

    Ok(())
}

pub(super) fn update_progress(
    progress: &SharedProgress,
    instance: u64,
    update: impl FnOnce(&mut Progress),
) {
    if let Ok(mut progress) = progress.lock() {
        if progress.instance != instance {
            *progress = Progress {
                instance,
                ..Progress::default()
            };
        }
        update(&mut progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(instance: u64) -> (LocalTrack, Receiver<LocalCommand>) {
        let (command_tx, command_rx) = mpsc::channel();
        let track = LocalTrack {
            instance,
            command_tx,
            progress: Arc::new(Mutex::new(Progress::default())),
            released: false,
        };
        (track, command_rx)
    }

    #[test]
    fn commands_carry_the_track_instance() {
        let (mut track, command_rx) = handle(7);

        track.play().unwrap();
        track.seek(42.0).unwrap();

        assert!(matches!(command_rx.try_recv(), Ok(LocalCommand::Play { instance: 7 })));
        assert!(matches!(
            command_rx.try_recv(),
            Ok(LocalCommand::Seek { instance: 7, seconds }) if seconds == 42.0
        ));
    }

    #[test]
    fn release_unloads_once() {
        let (mut track, command_rx) = handle(2);

        track.release();
        drop(track);

        assert!(matches!(command_rx.try_recv(), Ok(LocalCommand::Unload { instance: 2 })));
        assert!(command_rx.try_recv().is_err());
    }

    #[test]
    fn stopped_engine_is_reported() {
        let (mut track, command_rx) = handle(1);
        drop(command_rx);

        assert!(matches!(track.pause(), Err(PlaybackError::BackendUnavailable(_))));
    }

    #[test]
    fn progress_belongs_to_the_loaded_instance() {
        let (track, _command_rx) = handle(5);

        update_progress(&track.progress, 5, |p| p.time = 33.0);
        assert_eq!(track.current_time(), Ok(33.0));

        update_progress(&track.progress, 6, |p| p.duration = 90.0);
        assert_eq!(track.current_time(), Ok(0.0));
        assert_eq!(track.duration(), Ok(0.0));
    }
}
