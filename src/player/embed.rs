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

//! Embedded YouTube video player.
//!
//! Videos are streamed through a dedicated `libmpv` instance per track, with
//! the stream resolved by an external program (`yt-dlp` by default). Before
//! any video can be played the resolver has to be found, this is the embed
//! API "load". The load happens at most once per process and completes
//! asynchronously with a readiness signal on the event channel.
//!
//! Unlike the local engine, an embedded player only pushes state changes.
//! Time and duration are sampled by the progress poller.

use anyhow::{Context, Result};
use mpv::Format;
use std::{
    process::Command,
    sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread,
};
use tracing::{debug, error, info, warn};

use crate::{
    error::PlaybackError,
    events::AppEvent,
    model::youtube,
    player::{
        BackendEvent, BackendKind, EmbedState, MediaBackend, Progress, SharedProgress,
        engine::{EngineFile, SeekPlan},
        local::update_progress,
        read_progress,
    },
};

// Reported when the stream for a video could not be resolved or opened. The
// resolver does not tell us why, so this is reported as "not found".
const LOAD_FAILED_CODE: i32 = 100;

/// Process-wide readiness of the embedded player.
pub(crate) struct EmbedApi {
    load_started: AtomicBool,
    ready: AtomicBool,
}

impl EmbedApi {
    pub(crate) const fn new() -> Self {
        Self {
            load_started: AtomicBool::new(false),
            ready: AtomicBool::new(false),
        }
    }

    /// The instance shared by the whole application.
    pub(crate) fn shared() -> Arc<EmbedApi> {
        static SHARED: OnceLock<Arc<EmbedApi>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(EmbedApi::new())))
    }

    /// Starts probing for the stream resolver.
    ///
    /// Only the first call does anything, later calls return `false`. The
    /// outcome arrives as [`BackendEvent::EmbedApiReady`] or
    /// [`BackendEvent::EmbedApiFailed`].
    pub(crate) fn load(&self, resolver: &str, event_tx: Sender<AppEvent>) -> bool {
        if self.load_started.swap(true, Ordering::SeqCst) {
            debug!("Embed API load already requested");
            return false;
        }

        let resolver = resolver.to_string();
        thread::spawn(move || {
            let event = match probe_resolver(&resolver) {
                Ok(version) => {
                    info!(resolver, version, "Stream resolver found");
                    BackendEvent::EmbedApiReady
                }
                Err(e) => {
                    warn!(resolver, error = %e, "Stream resolver unavailable");
                    BackendEvent::EmbedApiFailed(format!("{:#}", e))
                }
            };
            let _ = event_tx.send(AppEvent::Backend(event));
        });

        true
    }

    /// Records readiness. Returns `true` only for the first signal.
    pub(crate) fn signal_ready(&self) -> bool {
        !self.ready.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

fn probe_resolver(resolver: &str) -> Result<String> {
    let output = Command::new(resolver)
        .arg("--version")
        .output()
        .with_context(|| format!("Failed to run {}", resolver))?;

    if !output.status.success() {
        anyhow::bail!("{} exited with {}", resolver, output.status);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Settings handed to every embedded player.
#[derive(Clone, Debug)]
pub(crate) struct EmbedOptions {
    pub(crate) ytdl_format: String,
}

#[derive(Debug)]
enum EmbedCommand {
    Play,
    Pause,
    Stop,
    Seek(f64),
    Volume(u8),
    Destroy,
}

/// One embedded player, bound to a single video.
pub(crate) struct EmbeddedPlayer {
    instance: u64,
    watch_url: String,
    api: Arc<EmbedApi>,
    options: EmbedOptions,
    event_tx: Sender<AppEvent>,
    progress: SharedProgress,
    worker: Option<Sender<EmbedCommand>>,
}

impl EmbeddedPlayer {
    /// Creates the player. If the embed API is already ready the video starts
    /// loading straight away, otherwise on first use.
    pub(crate) fn new(
        instance: u64,
        video_id: &str,
        api: Arc<EmbedApi>,
        options: EmbedOptions,
        event_tx: Sender<AppEvent>,
    ) -> Self {
        let mut player = Self {
            instance,
            watch_url: youtube::watch_url(video_id),
            api,
            options,
            event_tx,
            progress: Arc::new(Mutex::new(Progress {
                instance,
                ..Progress::default()
            })),
            worker: None,
        };

        if player.api.is_ready() {
            if let Err(e) = player.worker() {
                warn!(instance, error = %e, "Video player did not start");
            }
        }

        player
    }

    fn worker(&mut self) -> Result<&Sender<EmbedCommand>, PlaybackError> {
        if !self.api.is_ready() {
            return Err(PlaybackError::NotReady);
        }

        let worker = self.worker.get_or_insert_with(|| {
            debug!(instance = self.instance, url = %self.watch_url, "Starting video player");
            spawn_embed_worker(
                self.instance,
                self.watch_url.clone(),
                self.options.clone(),
                self.event_tx.clone(),
                Arc::clone(&self.progress),
            )
        });

        Ok(worker)
    }

    fn send(&mut self, command: EmbedCommand) -> Result<(), PlaybackError> {
        self.worker()?
            .send(command)
            .map_err(|_| PlaybackError::BackendUnavailable("video player has stopped".into()))
    }
}

impl MediaBackend for EmbeddedPlayer {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    fn instance(&self) -> u64 {
        self.instance
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        self.send(EmbedCommand::Play)
    }

    fn pause(&mut self) -> Result<(), PlaybackError> {
        self.send(EmbedCommand::Pause)
    }

    fn stop(&mut self) -> Result<(), PlaybackError> {
        self.send(EmbedCommand::Stop)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        self.send(EmbedCommand::Seek(seconds))
    }

    fn current_time(&self) -> Result<f64, PlaybackError> {
        if !self.api.is_ready() {
            return Err(PlaybackError::NotReady);
        }
        read_progress(&self.progress, self.instance).map(|p| p.time)
    }

    fn duration(&self) -> Result<f64, PlaybackError> {
        if !self.api.is_ready() {
            return Err(PlaybackError::NotReady);
        }
        read_progress(&self.progress, self.instance).map(|p| p.duration)
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), PlaybackError> {
        self.send(EmbedCommand::Volume(volume))
    }

    fn release(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.send(EmbedCommand::Destroy);
        }
    }
}

impl Drop for EmbeddedPlayer {
    fn drop(&mut self) {
        self.release();
    }
}

fn spawn_embed_worker(
    instance: u64,
    url: String,
    options: EmbedOptions,
    event_tx: Sender<AppEvent>,
    progress: SharedProgress,
) -> Sender<EmbedCommand> {
    let (command_tx, command_rx) = mpsc::channel();

    thread::spawn(move || {
        if let Err(e) = embed_worker(instance, &url, &options, command_rx, &event_tx, &progress) {
            error!(instance, error = ?e, "Video player failed");
            let _ = event_tx.send(AppEvent::Backend(BackendEvent::EmbedState {
                instance,
                state: EmbedState::Error(LOAD_FAILED_CODE),
            }));
        }
    });

    command_tx
}

struct EmbedStatus {
    announced: bool,
    // Pause changes are only reported once playback was requested.
    started: bool,
    paused: bool,
    file: EngineFile,
}

fn embed_worker(
    instance: u64,
    url: &str,
    options: &EmbedOptions,
    command_rx: Receiver<EmbedCommand>,
    event_tx: &Sender<AppEvent>,
    progress: &SharedProgress,
) -> Result<()> {
    let mut handler = (|| {
        let mut builder = mpv::MpvHandlerBuilder::new().context("Failed to create MPV builder")?;
        builder
            .set_option("vo", "null")
            .context("Failed to set no video output")?;
        builder
            .set_option("ytdl", "yes")
            .context("Failed to enable ytdl")?;
        builder
            .set_option("ytdl-format", options.ytdl_format.as_str())
            .context("Failed to set ytdl format")?;
        builder
            .set_option("pause", "yes")
            .context("Failed to start paused")?;
        builder.build().context("Failed to build MPV handler")
    })()?;

    handler
        .observe_property::<f64>("duration", 0)
        .context("Failed to observe duration")?;
    handler
        .observe_property::<f64>("time-pos", 0)
        .context("Failed to observe time-pos")?;
    handler
        .observe_property::<bool>("pause", 0)
        .context("Failed to observe pause")?;
    handler
        .observe_property::<bool>("idle-active", 0)
        .context("Failed to observe idle-active")?;

    let mut status = EmbedStatus {
        announced: false,
        started: false,
        paused: true,
        file: EngineFile::default(),
    };

    load_video(&mut handler, url, &mut status)?;

    loop {
        if !process_commands(&mut handler, url, &command_rx, &mut status)? {
            debug!(instance, "Video player destroyed");
            return Ok(());
        }

        if let Some(event) = next_state_event(&mut handler, instance, &mut status, progress) {
            event_tx
                .send(AppEvent::Backend(event))
                .context("Failed to send video player event")?;
        }
    }
}

fn load_video(handler: &mut mpv::MpvHandler, url: &str, status: &mut EmbedStatus) -> Result<()> {
    status.file.loading();
    handler
        .command(&["loadfile", url, "replace"])
        .context(format!("Failed to load video: {}", url))
}

fn process_commands(
    handler: &mut mpv::MpvHandler,
    url: &str,
    command_rx: &Receiver<EmbedCommand>,
    status: &mut EmbedStatus,
) -> Result<bool> {
    loop {
        let command = match command_rx.try_recv() {
            Ok(command) => command,
            Err(mpsc::TryRecvError::Empty) => return Ok(true),
            Err(mpsc::TryRecvError::Disconnected) => return Ok(false),
        };

        match command {
            EmbedCommand::Play => {
                status.started = true;
                if status.file.needs_reload() {
                    debug!(url, "Reloading video after it ended");
                    load_video(handler, url, status)?;
                }
                handler.set_property("pause", false)?;
            }
            EmbedCommand::Pause => handler.set_property("pause", true)?,
            EmbedCommand::Stop => {
                handler.set_property("pause", true)?;
                status.file.stop();
                if status.file.is_loaded() {
                    if let Err(e) = handler.command(&["seek", "0", "absolute"]) {
                        debug!(error = ?e, "Rewind on stop failed");
                    }
                }
            }
            EmbedCommand::Seek(seconds) => match status.file.seek(seconds) {
                SeekPlan::Now => {
                    if let Err(e) = handler.command(&["seek", &seconds.to_string(), "absolute"]) {
                        // The stream may not be seekable until it has buffered.
                        debug!(error = ?e, seconds, "Video seek failed");
                    }
                }
                SeekPlan::Deferred => debug!(seconds, "Video seek deferred until loaded"),
            },
            EmbedCommand::Volume(volume) => handler.set_property("volume", f64::from(volume))?,
            EmbedCommand::Destroy => return Ok(false),
        }
    }
}

fn next_state_event(
    handler: &mut mpv::MpvHandler,
    instance: u64,
    status: &mut EmbedStatus,
    progress: &SharedProgress,
) -> Option<BackendEvent> {
    let event = handler.wait_event(0.05)?;

    if let mpv::Event::FileLoaded = event {
        if let Some(seconds) = status.file.loaded() {
            if let Err(e) = handler.command(&["seek", &seconds.to_string(), "absolute"]) {
                debug!(error = ?e, seconds, "Deferred video seek failed");
            }
        }
        return None;
    }

    match event {
        mpv::Event::PropertyChange { name, change, .. } => match (name, change) {
            // The first known duration means the stream has been resolved.
            ("duration", Format::Double(seconds)) => {
                update_progress(progress, instance, |p| p.duration = seconds);
                if status.announced || seconds <= 0.0 {
                    return None;
                }
                status.announced = true;
                Some(BackendEvent::EmbedReady {
                    instance,
                    duration: seconds,
                })
            }
            ("time-pos", Format::Double(seconds)) if seconds >= 0.0 => {
                update_progress(progress, instance, |p| p.time = seconds);
                None
            }
            ("idle-active", Format::Flag(idle)) => {
                status.file.set_idle(idle);
                None
            }
            ("pause", Format::Flag(paused)) => {
                let changed = paused != status.paused;
                status.paused = paused;
                if !status.started || !changed {
                    return None;
                }
                let state = if paused {
                    EmbedState::Paused
                } else {
                    EmbedState::Playing
                };
                Some(BackendEvent::EmbedState { instance, state })
            }
            _ => None,
        },
        mpv::Event::EndFile(Ok(mpv::EndFileReason::MPV_END_FILE_REASON_EOF)) => {
            status.file.set_idle(true);
            Some(BackendEvent::EmbedState {
                instance,
                state: EmbedState::Ended,
            })
        }
        mpv::Event::EndFile(Err(e)) => {
            status.file.set_idle(true);
            warn!(instance, error = ?e, "Video could not be played");
            Some(BackendEvent::EmbedState {
                instance,
                state: EmbedState::Error(LOAD_FAILED_CODE),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn options() -> EmbedOptions {
        EmbedOptions {
            ytdl_format: "bestaudio".to_string(),
        }
    }

    #[test]
    fn first_ready_signal_wins() {
        let api = EmbedApi::new();
        assert!(!api.is_ready());

        assert!(api.signal_ready());
        assert!(!api.signal_ready());
        assert!(api.is_ready());
    }

    #[test]
    fn load_runs_once() {
        let api = EmbedApi::new();
        let (event_tx, event_rx) = mpsc::channel();

        assert!(api.load("cassette-no-such-resolver", event_tx.clone()));
        assert!(!api.load("cassette-no-such-resolver", event_tx));

        let event = event_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            event,
            AppEvent::Backend(BackendEvent::EmbedApiFailed(_))
        ));
        assert!(event_rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert!(!api.is_ready());
    }

    #[test]
    fn calls_before_readiness_are_refused() {
        let api = Arc::new(EmbedApi::new());
        let (event_tx, _event_rx) = mpsc::channel();
        let mut player = EmbeddedPlayer::new(1, "dQw4w9WgXcQ", api, options(), event_tx);

        assert_eq!(player.play(), Err(PlaybackError::NotReady));
        assert_eq!(player.seek(10.0), Err(PlaybackError::NotReady));
        assert_eq!(player.current_time(), Err(PlaybackError::NotReady));
        assert!(player.worker.is_none());
        assert_eq!(player.watch_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }
}
