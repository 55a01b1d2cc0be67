// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Playback position tracking for a single player
//!
//! ```text
//! Idle -> Loading -> Playing <-> Paused -> Finished -> Idle
//! ```
//!
//! The host drives the tracker with media events ([`on_loaded`],
//! [`on_time_update`], [`on_ended`]) and user commands. Progress is written
//! through a [`ListenStore`] at most once per [`PERSIST_INTERVAL`].
//!
//! [`on_loaded`]: PlaybackTracker::on_loaded
//! [`on_time_update`]: PlaybackTracker::on_time_update
//! [`on_ended`]: PlaybackTracker::on_ended

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::media::MediaElement;
use crate::http::HttpClient;
use crate::model::{Listen, PodcastEpisode};
use crate::sync::DataManager;

/// Minimum playback distance, in seconds, between two persisted positions
pub const PERSIST_INTERVAL: f64 = 2.0;

/// Seconds skipped by [`PlaybackTracker::forward`]
pub const FORWARD_STEP: f64 = 30.0;

/// Seconds skipped back by [`PlaybackTracker::rewind`]
pub const REWIND_STEP: f64 = 10.0;

const DESKTOP_VOLUME: f64 = 0.3;
const MOBILE_VOLUME: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// No episode loaded
    Idle,
    /// Source assigned, waiting for the media to be ready
    Loading,
    Playing,
    Paused,
    /// Reached the end; stays here until the host clears the episode
    Finished,
}

/// Why an episode is being loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadCause {
    /// The user picked the episode; playback starts right away
    Selection,
    /// Restored after start-up or a token refresh; stays paused
    Refresh,
}

impl LoadCause {
    fn autoplay(self) -> bool {
        matches!(self, LoadCause::Selection)
    }
}

/// Construction parameters for a [`PlaybackTracker`]
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerOptions {
    /// Mobile hosts leave volume to the device and start at full volume
    pub is_mobile: bool,
}

/// Where a tracker reads starting positions and writes progress
#[async_trait]
pub trait ListenStore: Send + Sync {
    /// Position to resume `episode` from, `None` if never played
    async fn starting_position(&self, episode: &PodcastEpisode) -> Option<f64>;

    async fn save_progress(&self, listen: &Listen);

    /// Forget the current-episode pointer
    async fn clear_current_episode(&self);
}

#[async_trait]
impl<C: HttpClient + 'static> ListenStore for DataManager<C> {
    async fn starting_position(&self, episode: &PodcastEpisode) -> Option<f64> {
        self.resume_position(&episode.content).await
    }

    async fn save_progress(&self, listen: &Listen) {
        // The backend write finishes in the background
        drop(self.set_listen_info(listen).await);
    }

    async fn clear_current_episode(&self) {
        self.set_current_episode(None).await;
    }
}

#[derive(Debug)]
struct Session {
    episode: PodcastEpisode,
    autoplay: bool,
    position: f64,
    last_persisted: f64,
}

/// Tracks and persists the playback position of one media element
pub struct PlaybackTracker<M> {
    media: M,
    store: Arc<dyn ListenStore>,
    state: PlayerState,
    session: Option<Session>,
    volume: f64,
}

impl<M: MediaElement> PlaybackTracker<M> {
    pub fn new(mut media: M, store: Arc<dyn ListenStore>, options: PlayerOptions) -> Self {
        let volume = if options.is_mobile {
            MOBILE_VOLUME
        } else {
            DESKTOP_VOLUME
        };
        media.set_volume(volume);

        Self {
            media,
            store,
            state: PlayerState::Idle,
            session: None,
            volume,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn episode(&self) -> Option<&PodcastEpisode> {
        self.session.as_ref().map(|s| &s.episode)
    }

    /// Last known position in seconds
    pub fn position(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.position)
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// Total length, from the media once known, else from the feed
    pub fn duration(&self) -> Option<f64> {
        self.media
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| {
                self.session
                    .as_ref()
                    .map(|s| s.episode.duration)
                    .filter(|d| *d > 0.0)
            })
    }

    /// Load a different episode, or unload with `None`
    ///
    /// Selecting the episode that is already loaded does nothing. Any other
    /// episode tears down the current session, including its throttle state.
    pub fn select(&mut self, episode: Option<PodcastEpisode>, cause: LoadCause) {
        let Some(episode) = episode else {
            self.teardown();
            self.state = PlayerState::Idle;
            return;
        };

        let already_loaded = self.state != PlayerState::Finished
            && self
                .session
                .as_ref()
                .is_some_and(|s| s.episode.is_same_media(&episode));
        if already_loaded {
            return;
        }

        self.teardown();
        debug!(episode_url = %episode.content, ?cause, "Loading episode");
        self.media.load(&episode.content);
        self.session = Some(Session {
            episode,
            autoplay: cause.autoplay(),
            position: 0.0,
            last_persisted: 0.0,
        });
        self.state = PlayerState::Loading;
    }

    /// The media is ready: seek to the resume position and start or pause
    pub async fn on_loaded(&mut self) -> PlayerState {
        if self.state != PlayerState::Loading {
            return self.state;
        }
        let Some(session) = self.session.as_ref() else {
            return self.state;
        };

        let start = self
            .store
            .starting_position(&session.episode)
            .await
            .unwrap_or(0.0);
        let start = self.clamp(start);
        self.media.set_current_time(start);

        let Some(session) = self.session.as_mut() else {
            return self.state;
        };
        session.position = start;
        session.last_persisted = start;

        self.state = if session.autoplay {
            self.media.play();
            PlayerState::Playing
        } else {
            PlayerState::Paused
        };

        debug!(position = start, state = ?self.state, "Episode ready");
        self.state
    }

    pub fn toggle_pause(&mut self) -> PlayerState {
        match self.state {
            PlayerState::Playing => {
                self.media.pause();
                self.state = PlayerState::Paused;
            }
            PlayerState::Paused => {
                self.media.play();
                self.state = PlayerState::Playing;
            }
            _ => {}
        }
        self.state
    }

    /// Record the media's current time, persisting it if it moved far enough
    ///
    /// Returns true if a listen record was written.
    pub async fn on_time_update(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        let now = self.media.current_time();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        session.position = now;

        if (now - session.last_persisted).abs() < PERSIST_INTERVAL {
            return false;
        }
        session.last_persisted = now;

        let Some(listen) = self.listen_at(now, false) else {
            return false;
        };
        self.store.save_progress(&listen).await;
        true
    }

    /// The media played to the end
    ///
    /// Marks the episode completed and clears the current-episode pointer.
    /// Returns the finished episode; the tracker stays `Finished` until the
    /// host selects another episode or `None`.
    pub async fn on_ended(&mut self) -> Option<PodcastEpisode> {
        if !self.is_active() {
            return None;
        }

        let end = self
            .duration()
            .unwrap_or_else(|| self.media.current_time());
        let listen = self.listen_at(end, true)?;

        self.state = PlayerState::Finished;
        let session = self.session.as_mut()?;
        session.position = end;
        session.last_persisted = end;
        let episode = session.episode.clone();

        self.store.save_progress(&listen).await;
        self.store.clear_current_episode().await;

        info!(episode_url = %episode.content, "Episode finished");
        Some(episode)
    }

    /// Skip ahead, stopping at the end of the media
    pub fn forward(&mut self) -> f64 {
        let target = self.position() + FORWARD_STEP;
        self.move_to(target)
    }

    /// Skip back, stopping at the start
    pub fn rewind(&mut self) -> f64 {
        let target = self.position() - REWIND_STEP;
        self.move_to(target)
    }

    /// Jump to `seconds`
    ///
    /// Ignored (returns false) while the duration is unknown or when the
    /// target lies past it.
    pub fn seek(&mut self, seconds: f64) -> bool {
        if !self.is_active() {
            return false;
        }

        match self.duration() {
            Some(duration) if seconds <= duration => {
                self.apply_position(seconds.max(0.0));
                true
            }
            _ => false,
        }
    }

    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(self.volume);
        self.volume
    }

    fn is_active(&self) -> bool {
        matches!(self.state, PlayerState::Playing | PlayerState::Paused)
    }

    fn move_to(&mut self, target: f64) -> f64 {
        if !self.is_active() {
            return self.position();
        }
        let target = self.clamp(target);
        self.apply_position(target);
        target
    }

    fn apply_position(&mut self, seconds: f64) {
        self.media.set_current_time(seconds);
        if let Some(session) = self.session.as_mut() {
            session.position = seconds;
        }
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let seconds = seconds.max(0.0);
        match self.duration() {
            Some(duration) => seconds.min(duration),
            None => seconds,
        }
    }

    fn listen_at(&self, seconds: f64, completed: bool) -> Option<Listen> {
        let session = self.session.as_ref()?;
        let duration = self.duration().unwrap_or(0.0);

        Some(Listen {
            time: seconds.round(),
            duration: duration.round(),
            is_completed: completed,
            ..Listen::from_episode(&session.episode)
        })
    }

    fn teardown(&mut self) {
        if self.session.take().is_some() {
            self.media.pause();
        }
    }
}
