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

//! Application configuration.
//!
//! This module manages the application configuration file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_NAME: &str = "cassette";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub(crate) version: u32,

    /// Directories imported by the `scan` command.
    pub(crate) media_dirs: Vec<String>,
    pub(crate) database_file: String,
    /// Where the demo tones of the `samples` command are written.
    pub(crate) samples_dir: String,

    /// Volume at start up, `0..=100`.
    pub(crate) volume: u8,

    /// Program used to resolve YouTube streams.
    pub(crate) resolver: String,
    pub(crate) ytdl_format: String,
    pub(crate) poll_interval_ms: u64,

    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub(crate) log_level: String,
    pub(crate) log_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            media_dirs: vec![],
            database_file: "cassette.db".to_string(),
            samples_dir: "samples".to_string(),
            volume: 75,
            resolver: "yt-dlp".to_string(),
            ytdl_format: "bestaudio/best".to_string(),
            poll_interval_ms: 1000,
            log_level: "info".to_string(),
            log_file: "cassette.log".to_string(),
        }
    }
}

impl AppConfig {
    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }
}

pub(crate) fn load_config() -> AppConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_default()
}

pub(crate) fn save_config(cfg: &AppConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}
