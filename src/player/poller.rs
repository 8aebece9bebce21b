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

//! Periodic progress sampling for backends that do not push their position.
//!
//! The poller never touches player state itself. Each tick is an
//! [`AppEvent::PollProgress`] and the event loop does the sampling, so a tick
//! can never race with a track change.

use std::{
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::debug;

use crate::events::AppEvent;

struct Running {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

pub(crate) struct ProgressPoller {
    interval: Duration,
    event_tx: Sender<AppEvent>,
    running: Option<Running>,
}

impl ProgressPoller {
    pub(crate) fn new(interval: Duration, event_tx: Sender<AppEvent>) -> Self {
        Self {
            interval,
            event_tx,
            running: None,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Starts or cancels the poller so that it runs exactly when asked to.
    pub(crate) fn sync(&mut self, should_run: bool) {
        match (should_run, self.is_running()) {
            (true, false) => self.start(),
            (false, true) => self.cancel(),
            _ => {}
        }
    }

    fn start(&mut self) {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let event_tx = self.event_tx.clone();
        let interval = self.interval;

        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if event_tx.send(AppEvent::PollProgress).is_err() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        debug!(?interval, "Progress poller started");
        self.running = Some(Running { stop_tx, handle });
    }

    /// Stops the poller. No tick is sent once this returns.
    fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            drop(running.stop_tx);
            let _ = running.handle.join();
            debug!("Progress poller cancelled");
        }
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_while_running_and_stops_on_cancel() {
        let (event_tx, event_rx) = mpsc::channel();
        let mut poller = ProgressPoller::new(Duration::from_millis(10), event_tx);

        poller.sync(true);
        assert!(poller.is_running());
        assert!(matches!(
            event_rx.recv_timeout(Duration::from_secs(2)),
            Ok(AppEvent::PollProgress)
        ));

        poller.sync(false);
        assert!(!poller.is_running());

        // Anything already queued was sent before the cancel returned.
        while event_rx.try_recv().is_ok() {}
        assert!(event_rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn sync_is_idempotent() {
        let (event_tx, _event_rx) = mpsc::channel();
        let mut poller = ProgressPoller::new(Duration::from_millis(10), event_tx);

        poller.sync(false);
        assert!(!poller.is_running());

        poller.sync(true);
        poller.sync(true);
        assert!(poller.is_running());
    }
}
