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

use std::sync::{Arc, mpsc::Sender};

use tracing::debug;

use crate::{
    error::PlaybackError,
    events::AppEvent,
    model::Track,
    player::{
        BackendFactory, MediaBackend,
        embed::{EmbedApi, EmbedOptions, EmbeddedPlayer},
        local::LocalAudio,
    },
};

/// Creates libmpv backed players: YouTube tracks get their own embedded
/// player, everything else shares the local audio engine.
pub(crate) struct MpvBackendFactory {
    local: LocalAudio,
    embed_api: Arc<EmbedApi>,
    embed_options: EmbedOptions,
    event_tx: Sender<AppEvent>,
    last_instance: u64,
}

impl MpvBackendFactory {
    pub(crate) fn new(
        embed_api: Arc<EmbedApi>,
        embed_options: EmbedOptions,
        event_tx: Sender<AppEvent>,
    ) -> Self {
        Self {
            local: LocalAudio::spawn(event_tx.clone()),
            embed_api,
            embed_options,
            event_tx,
            last_instance: 0,
        }
    }
}

impl BackendFactory for MpvBackendFactory {
    fn attach(&mut self, track: &Track) -> Result<Box<dyn MediaBackend>, PlaybackError> {
        self.last_instance += 1;
        let instance = self.last_instance;

        if track.is_youtube {
            let video_id = track
                .video_id
                .as_deref()
                .ok_or(PlaybackError::NoPlayableSource)?;

            debug!(instance, video_id, "Attaching video player");
            return Ok(Box::new(EmbeddedPlayer::new(
                instance,
                video_id,
                Arc::clone(&self.embed_api),
                self.embed_options.clone(),
                self.event_tx.clone(),
            )));
        }

        let url = track
            .source_url
            .as_deref()
            .ok_or(PlaybackError::NoPlayableSource)?;

        debug!(instance, url, "Attaching local audio");
        Ok(Box::new(self.local.attach(instance, url)?))
    }
}
