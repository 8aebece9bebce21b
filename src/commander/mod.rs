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

//! Command-line input logic and state management.
//!
//! This module implements a command-line processing component, handling a
//! text input component, and dispatching the corresponding task or event when
//! a command is submitted.
//!
//! # Commands
//!
//! * `add <url> [title] [| artist]` - register a YouTube link
//! * `scan` - import audio files from the configured media directories
//! * `samples` - add a couple of demo tones to the library
//! * `rm` - remove the song under the cursor
//! * `vol <0-100>` - set the volume
//! * `repeat`, `shuffle` - toggle playback modes
//! * `q` - quit

use std::sync::mpsc::Sender;

use anyhow::Result;
use crossterm::event::{Event, KeyCode};
use tui_input::{Input, backend::crossterm::EventHandler};

use crate::{events::AppEvent, tasks::AppTask};

#[derive(Debug, PartialEq)]
enum Command {
    Add {
        url: String,
        title: String,
        artist: Option<String>,
    },
    Scan,
    Samples,
    Remove,
    Volume(i32),
    Repeat,
    Shuffle,
    Quit,
}

pub(crate) struct Commander {
    active: bool,
    pub(crate) input: Input,
}

impl Commander {
    pub(crate) fn new() -> Self {
        Self {
            active: false,
            input: Input::default(),
        }
    }

    pub(crate) fn active(&self) -> bool {
        self.active
    }

    /// Handles a terminal event, returning `true` if it was consumed.
    pub(crate) fn handle_event(
        &mut self,
        event: &Event,
        task_tx: &Sender<AppTask>,
        event_tx: &Sender<AppEvent>,
    ) -> Result<bool> {
        let Event::Key(key_event) = event else {
            return Ok(false);
        };

        if !self.active {
            if key_event.code == KeyCode::Char(':') {
                self.active = true;
                return Ok(true);
            }
            return Ok(false);
        }

        match key_event.code {
            KeyCode::Esc => {
                self.active = false;
                self.input.reset();
            }

            KeyCode::Enter => {
                let buffer = self.input.value().trim().to_string();
                self.input.reset();
                self.active = false;

                if !buffer.is_empty() {
                    match parse_command(&buffer) {
                        Ok(command) => run_command(command, task_tx, event_tx)?,
                        Err(message) => event_tx.send(AppEvent::Error(message))?,
                    }
                }
            }

            // Delegate all other key events to the managed input component.
            _ => {
                self.input.handle_event(event);
            }
        }

        Ok(true)
    }
}

fn parse_command(buffer: &str) -> Result<Command, String> {
    let (name, rest) = match buffer.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (buffer, ""),
    };

    match (name, rest) {
        ("add", rest) => {
            let (link, details) = match rest.split_once(char::is_whitespace) {
                Some((link, details)) => (link, details),
                None => (rest, ""),
            };
            if link.is_empty() {
                return Err("Usage: add <url> [title] [| artist]".to_string());
            }

            let (title, artist) = match details.split_once('|') {
                Some((title, artist)) => (title.trim(), Some(artist.trim().to_string())),
                None => (details.trim(), None),
            };

            Ok(Command::Add {
                url: link.to_string(),
                title: title.to_string(),
                artist: artist.filter(|a| !a.is_empty()),
            })
        }
        ("scan", "") => Ok(Command::Scan),
        ("samples", "") => Ok(Command::Samples),
        ("rm", "") => Ok(Command::Remove),
        ("vol", level) => level
            .parse::<i32>()
            .map(Command::Volume)
            .map_err(|_| "Usage: vol <0-100>".to_string()),
        ("repeat", "") => Ok(Command::Repeat),
        ("shuffle", "") => Ok(Command::Shuffle),
        ("q", "") => Ok(Command::Quit),
        (name, _) => Err(format!("Unknown command: {}", name)),
    }
}

fn run_command(
    command: Command,
    task_tx: &Sender<AppTask>,
    event_tx: &Sender<AppEvent>,
) -> Result<()> {
    match command {
        Command::Add { url, title, artist } => {
            task_tx.send(AppTask::AddYoutubeSong { url, title, artist })?
        }
        Command::Scan => task_tx.send(AppTask::ImportMediaDirs)?,
        Command::Samples => task_tx.send(AppTask::AddSampleSongs)?,
        Command::Remove => event_tx.send(AppEvent::RemoveSelectedSong)?,
        Command::Volume(level) => event_tx.send(AppEvent::SetVolume(level))?,
        Command::Repeat => event_tx.send(AppEvent::ToggleRepeat)?,
        Command::Shuffle => event_tx.send(AppEvent::ToggleShuffle)?,
        Command::Quit => event_tx.send(AppEvent::ExitApplication)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use crossterm::event::{KeyEvent, KeyModifiers};

    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn parses_add_with_title_and_artist() {
        assert_eq!(
            parse_command("add https://youtu.be/dQw4w9WgXcQ Never Gonna | Rick Astley"),
            Ok(Command::Add {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                title: "Never Gonna".to_string(),
                artist: Some("Rick Astley".to_string()),
            })
        );
        assert_eq!(
            parse_command("add https://youtu.be/dQw4w9WgXcQ"),
            Ok(Command::Add {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                title: String::new(),
                artist: None,
            })
        );
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_command("scan"), Ok(Command::Scan));
        assert_eq!(parse_command("samples"), Ok(Command::Samples));
        assert_eq!(parse_command("rm"), Ok(Command::Remove));
        assert_eq!(parse_command("vol 40"), Ok(Command::Volume(40)));
        assert_eq!(parse_command("repeat"), Ok(Command::Repeat));
        assert_eq!(parse_command("shuffle"), Ok(Command::Shuffle));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("add").is_err());
        assert!(parse_command("vol loud").is_err());
        assert_eq!(parse_command("dance"), Err("Unknown command: dance".to_string()));
    }

    #[test]
    fn typed_command_is_dispatched() {
        let (task_tx, task_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let mut commander = Commander::new();

        assert!(!commander.handle_event(&key(KeyCode::Char('x')), &task_tx, &event_tx).unwrap());
        assert!(commander.handle_event(&key(KeyCode::Char(':')), &task_tx, &event_tx).unwrap());
        assert!(commander.active());

        for c in "vol 30".chars() {
            commander.handle_event(&key(KeyCode::Char(c)), &task_tx, &event_tx).unwrap();
        }
        commander.handle_event(&key(KeyCode::Enter), &task_tx, &event_tx).unwrap();

        assert!(!commander.active());
        assert_eq!(commander.input.value(), "");
        assert!(matches!(event_rx.try_recv(), Ok(AppEvent::SetVolume(30))));
        assert!(task_rx.try_recv().is_err());
    }
}
