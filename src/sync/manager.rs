// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cache-then-remote reconciliation of every resource the client shows
//!
//! Each load delivers the cached value first (possibly `None`), then asks the
//! backend. A successful answer is written through to the cache and
//! delivered second; a failed one is logged and dropped, leaving the cached
//! answer as final. Token-gated resources skip the backend entirely while
//! signed out.
//!
//! Mutations always update the cache before they resolve. The matching
//! backend write is only sent with a token and runs in the background; the
//! returned [`PendingWrite`] can be awaited or dropped.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::delivery::{Deliveries, Delivery, Watched, WatchedDeliveries};
use crate::api::ApiClient;
use crate::auth::TokenWatch;
use crate::cache::{Bucket, CacheKey, LocalCache};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::model::{Category, Listen, Podcast, PodcastEpisode, PodcastFeed};

type RemoteRead<T> = BoxFuture<'static, Result<Option<T>, ApiError>>;
type RemoteWrite = BoxFuture<'static, Result<(), ApiError>>;

/// Handle on the background backend write of a mutation
///
/// The local cache is already up to date when a `PendingWrite` is handed
/// out. Dropping it does not cancel the backend write.
#[must_use = "drop explicitly if the backend write should not be awaited"]
pub struct PendingWrite {
    remote: Option<JoinHandle<()>>,
}

impl PendingWrite {
    fn local_only() -> Self {
        Self { remote: None }
    }

    /// True if no backend write was sent (signed out)
    pub fn is_local_only(&self) -> bool {
        self.remote.is_none()
    }

    /// Wait for the backend write, if any, to finish
    pub async fn settled(self) {
        if let Some(handle) = self.remote {
            let _ = handle.await;
        }
    }
}

/// Reconciles the podcast backend with the local cache
pub struct DataManager<C> {
    api: Arc<ApiClient<C>>,
    cache: LocalCache,
    tokens: TokenWatch,
}

impl<C> Clone for DataManager<C> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

impl<C: HttpClient + 'static> DataManager<C> {
    /// Create a manager reading the access token from `tokens`
    pub fn new(api: ApiClient<C>, cache: LocalCache, tokens: TokenWatch) -> Self {
        Self {
            api: Arc::new(api),
            cache,
            tokens,
        }
    }

    /// The bearer token in effect right now
    pub fn access_token(&self) -> Option<String> {
        self.tokens.borrow().clone()
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn categories(&self) -> Deliveries<Vec<Category>> {
        let api = self.api.clone();
        let remote = async move { api.get_categories().await.map(Some) }.boxed();
        self.load(CacheKey::Categories, Some(remote))
    }

    pub fn top_podcasts(&self) -> Deliveries<Vec<Podcast>> {
        let api = self.api.clone();
        let remote = async move { api.get_top_podcasts().await.map(Some) }.boxed();
        self.load(CacheKey::Podcasts(Bucket::Top), Some(remote))
    }

    pub fn podcasts_by_category(&self, category_id: i64) -> Deliveries<Vec<Podcast>> {
        let api = self.api.clone();
        let remote = async move { api.get_podcasts_by_category(category_id).await.map(Some) }.boxed();
        self.load(CacheKey::Podcasts(Bucket::Category(category_id)), Some(remote))
    }

    /// The user's subscriptions; cache-only while signed out
    pub fn subscriptions(&self) -> Deliveries<Vec<Podcast>> {
        let remote = self.access_token().map(|token| {
            let api = self.api.clone();
            async move { api.get_subscriptions(&token).await.map(Some) }.boxed()
        });
        self.load(CacheKey::Podcasts(Bucket::Subscriptions), remote)
    }

    /// A parsed feed
    ///
    /// Signed out, the backend knows nothing of local progress, so cached
    /// listen records are laid over the fresh feed before it is stored.
    pub fn feed(&self, rss_url: &str) -> Deliveries<PodcastFeed> {
        let token = self.access_token();
        let api = self.api.clone();
        let cache = self.cache.clone();
        let url = rss_url.to_string();

        let remote = async move {
            let mut feed = api.parse_feed(&url, token.as_deref()).await?;
            if token.is_none() {
                overlay_local_progress(&cache, &mut feed).await;
            }
            Ok(Some(feed))
        }
        .boxed();

        self.load(CacheKey::feed(rss_url), Some(remote))
    }

    /// The listen record of one episode; cache-only while signed out
    pub fn listen_info(&self, episode_url: &str) -> Deliveries<Listen> {
        let remote = self.access_token().map(|token| {
            let api = self.api.clone();
            let url = episode_url.to_string();
            async move { api.get_listen_info(&token, &url).await }.boxed()
        });
        self.load(CacheKey::position(episode_url), remote)
    }

    /// The episode loaded in the player
    ///
    /// Signed in, the backend's most recently played episode takes over.
    pub fn current_episode(&self) -> Deliveries<PodcastEpisode> {
        let remote = self.access_token().map(|token| {
            let api = self.api.clone();
            async move { api.get_latest_episode(&token).await }.boxed()
        });
        self.load(CacheKey::CurrentEpisode, remote)
    }

    /// Like [`subscriptions`](Self::subscriptions), reloaded on every token change
    pub fn watch_subscriptions(&self) -> WatchedDeliveries<Vec<Podcast>> {
        self.watch_gated(|manager| manager.subscriptions())
    }

    /// Like [`listen_info`](Self::listen_info), reloaded on every token change
    pub fn watch_listen_info(&self, episode_url: &str) -> WatchedDeliveries<Listen> {
        let url = episode_url.to_string();
        self.watch_gated(move |manager| manager.listen_info(&url))
    }

    /// Like [`current_episode`](Self::current_episode), reloaded on every token change
    pub fn watch_current_episode(&self) -> WatchedDeliveries<PodcastEpisode> {
        self.watch_gated(|manager| manager.current_episode())
    }

    /// Search the backend's directory; never cached
    pub async fn search_podcasts(&self, term: &str) -> Option<Vec<Podcast>> {
        match self.api.search_podcasts(term).await {
            Ok(podcasts) => Some(podcasts),
            Err(e) => {
                warn!(term, error = %e, "Search failed");
                None
            }
        }
    }

    /// The position playback of an episode should resume from
    ///
    /// The later of the cached and (signed in) remote records wins. A
    /// completed episode starts over.
    pub async fn resume_position(&self, episode_url: &str) -> Option<f64> {
        let latest = self
            .listen_info(episode_url)
            .collect_all()
            .await
            .into_iter()
            .filter_map(|delivery| delivery.value)
            .max_by(|a, b| a.time.total_cmp(&b.time))?;

        Some(if latest.is_completed { 0.0 } else { latest.time })
    }

    pub async fn add_subscription(&self, podcast: &Podcast) -> PendingWrite {
        let podcast = Podcast {
            is_subscribed: true,
            ..podcast.clone()
        };

        let mut subscriptions = self
            .cache
            .podcasts(Bucket::Subscriptions)
            .await
            .unwrap_or_default();
        if !subscriptions.iter().any(|p| p.rss_url == podcast.rss_url) {
            subscriptions.push(podcast.clone());
            self.cache
                .set_podcasts(Bucket::Subscriptions, &subscriptions)
                .await;
        }
        self.set_cached_feed_subscribed(&podcast.rss_url, true).await;

        let remote = self.access_token().map(|token| {
            let api = self.api.clone();
            async move { api.add_subscription(&token, &podcast).await }.boxed()
        });
        self.dispatch("add_subscription", remote)
    }

    pub async fn delete_subscription(&self, rss_url: &str) -> PendingWrite {
        if let Some(mut subscriptions) = self.cache.podcasts(Bucket::Subscriptions).await {
            let before = subscriptions.len();
            subscriptions.retain(|p| p.rss_url != rss_url);
            if subscriptions.len() != before {
                self.cache
                    .set_podcasts(Bucket::Subscriptions, &subscriptions)
                    .await;
            }
        }
        self.set_cached_feed_subscribed(rss_url, false).await;

        let remote = self.access_token().map(|token| {
            let api = self.api.clone();
            let url = rss_url.to_string();
            async move { api.delete_subscription(&token, &url).await }.boxed()
        });
        self.dispatch("delete_subscription", remote)
    }

    /// Persist playback progress
    ///
    /// The position entry and the matching episode of the cached feed are
    /// both written before this resolves.
    pub async fn set_listen_info(&self, listen: &Listen) -> PendingWrite {
        self.cache.set_listen(listen).await;

        let remote = self.access_token().map(|token| {
            let api = self.api.clone();
            let listen = listen.clone();
            async move { api.set_listen_info(&token, &listen).await }.boxed()
        });
        self.dispatch("set_listen_info", remote)
    }

    /// Replace the current-episode pointer; cache only
    pub async fn set_current_episode(&self, episode: Option<&PodcastEpisode>) {
        self.cache.set_current_episode(episode).await;
    }

    /// Mark an episode fully played or reset it to unplayed
    ///
    /// If the episode is the one loaded in the player, the current-episode
    /// pointer is cleared as well.
    pub async fn mark_played(&self, episode: &PodcastEpisode, played: bool) -> PendingWrite {
        let listen = Listen::with_completion(episode, played);
        let write = self.set_listen_info(&listen).await;

        let is_current = self
            .cache
            .current_episode()
            .await
            .is_some_and(|current| current.is_same_media(episode));
        if is_current {
            debug!(episode_url = %episode.content, "Clearing current episode");
            self.cache.set_current_episode(None).await;
        }

        write
    }

    fn load<T>(&self, key: CacheKey, remote: Option<RemoteRead<T>>) -> Deliveries<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = self.cache.clone();

        tokio::spawn(async move {
            let cached = cache.read::<T>(&key).await;
            // A closed receiver only means nobody is listening any more
            let _ = tx.send(Delivery::cached(cached));

            let Some(remote) = remote else {
                debug!(key = %key, "Signed out, serving cache only");
                return;
            };

            match remote.await {
                Ok(Some(value)) => {
                    cache.write(&key, &value).await;
                    let _ = tx.send(Delivery::remote(value));
                }
                Ok(None) => debug!(key = %key, "Backend has no value"),
                Err(e) => warn!(key = %key, error = %e, "Remote load failed, keeping cached value"),
            }
        });

        Deliveries::new(rx)
    }

    fn watch_gated<T, F>(&self, load: F) -> WatchedDeliveries<T>
    where
        T: Send + 'static,
        F: Fn(&Self) -> Deliveries<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = self.clone();
        let mut tokens = self.tokens.clone();

        tokio::spawn(async move {
            let _ = tokens.borrow_and_update();
            let mut generation = 0;

            loop {
                let mut run = load(&manager);
                while let Some(delivery) = run.next().await {
                    if tx.send(Watched { generation, delivery }).is_err() {
                        return;
                    }
                }

                tokio::select! {
                    changed = tokens.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = tx.closed() => return,
                }

                generation += 1;
                debug!(generation, "Access token changed, reloading");
            }
        });

        WatchedDeliveries::new(rx)
    }

    fn dispatch(&self, operation: &'static str, remote: Option<RemoteWrite>) -> PendingWrite {
        let Some(remote) = remote else {
            debug!(operation, "Signed out, kept local only");
            return PendingWrite::local_only();
        };

        let handle = tokio::spawn(async move {
            if let Err(e) = remote.await {
                warn!(operation, error = %e, "Backend write failed");
            }
        });

        PendingWrite {
            remote: Some(handle),
        }
    }

    async fn set_cached_feed_subscribed(&self, rss_url: &str, subscribed: bool) {
        if let Some(mut feed) = self.cache.feed(rss_url).await
            && feed.is_subscribed != subscribed
        {
            feed.is_subscribed = subscribed;
            self.cache.set_feed(&feed).await;
        }
    }
}

async fn overlay_local_progress(cache: &LocalCache, feed: &mut PodcastFeed) {
    let mut listens = Vec::new();
    for item in &feed.items {
        if let Some(listen) = cache.listen(&item.content).await {
            listens.push(listen);
        }
    }

    for listen in &listens {
        feed.apply_listen(listen);
    }
}
