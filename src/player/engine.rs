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

//! File lifecycle bookkeeping shared by the libmpv workers.
//!
//! Once a file plays to its end libmpv unloads it and goes idle. Seeking an
//! idle engine fails and unpausing it plays nothing, so the workers consult
//! [`EngineFile`] to decide when a file has to be loaded again and when a
//! seek must wait for the load to finish.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileState {
    Idle,
    Loading,
    Loaded,
}

#[derive(Debug, PartialEq)]
pub(super) enum SeekPlan {
    Now,
    Deferred,
}

#[derive(Debug)]
pub(super) struct EngineFile {
    state: FileState,
    pending_seek: Option<f64>,
}

impl Default for EngineFile {
    fn default() -> Self {
        Self {
            state: FileState::Idle,
            pending_seek: None,
        }
    }
}

impl EngineFile {
    /// A `loadfile` was issued.
    pub(super) fn loading(&mut self) {
        self.state = FileState::Loading;
    }

    /// A new file replaces the old one, dropping any pending seek.
    pub(super) fn replace(&mut self) {
        self.loading();
        self.pending_seek = None;
    }

    /// The file was loaded. Returns the seek to apply now, if any.
    pub(super) fn loaded(&mut self) -> Option<f64> {
        self.state = FileState::Loaded;
        self.pending_seek.take()
    }

    /// Follows libmpv's `idle-active` property.
    pub(super) fn set_idle(&mut self, idle: bool) {
        if idle {
            self.state = FileState::Idle;
        }
    }

    pub(super) fn is_loaded(&self) -> bool {
        self.state == FileState::Loaded
    }

    /// Whether play has to load the file again first.
    pub(super) fn needs_reload(&self) -> bool {
        self.state == FileState::Idle
    }

    pub(super) fn seek(&mut self, seconds: f64) -> SeekPlan {
        if self.is_loaded() {
            return SeekPlan::Now;
        }

        self.pending_seek = (seconds > 0.0).then_some(seconds);
        SeekPlan::Deferred
    }

    /// Stopping rewinds, so a pending seek no longer applies.
    pub(super) fn stop(&mut self) {
        self.pending_seek = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played_to_end() -> EngineFile {
        let mut file = EngineFile::default();
        file.replace();
        file.set_idle(false);
        assert_eq!(file.loaded(), None);
        file.set_idle(true);
        file
    }

    #[test]
    fn fresh_engine_needs_a_load() {
        let file = EngineFile::default();

        assert!(file.needs_reload());
        assert!(!file.is_loaded());
    }

    #[test]
    fn restart_after_end_reloads_instead_of_seeking() {
        let mut file = played_to_end();

        assert_eq!(file.seek(0.0), SeekPlan::Deferred);
        assert!(file.needs_reload());

        file.loading();
        assert!(!file.needs_reload());
        assert_eq!(file.loaded(), None);
        assert_eq!(file.seek(30.0), SeekPlan::Now);
    }

    #[test]
    fn seek_after_end_is_applied_once_reloaded() {
        let mut file = played_to_end();

        assert_eq!(file.seek(42.0), SeekPlan::Deferred);
        file.loading();

        assert_eq!(file.loaded(), Some(42.0));
        assert_eq!(file.loaded(), None);
    }

    #[test]
    fn seek_while_loading_waits_for_the_file() {
        let mut file = EngineFile::default();
        file.replace();

        assert_eq!(file.seek(10.0), SeekPlan::Deferred);
        assert!(!file.needs_reload());
        assert_eq!(file.loaded(), Some(10.0));
    }

    #[test]
    fn stop_and_replace_drop_pending_seeks() {
        let mut file = played_to_end();
        file.seek(42.0);
        file.stop();
        file.loading();
        assert_eq!(file.loaded(), None);

        let mut file = played_to_end();
        file.seek(42.0);
        file.replace();
        assert_eq!(file.loaded(), None);
    }
}
