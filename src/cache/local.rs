use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::key::{Bucket, CacheKey};
use super::store::SharedCacheStore;
use crate::error::CacheError;
use crate::model::{Category, Listen, Podcast, PodcastEpisode, PodcastFeed};

/// Typed access to the cache namespace
///
/// Nothing here fails: unreadable entries are logged and treated as absent,
/// and failed writes are logged and dropped.
#[derive(Clone)]
pub struct LocalCache {
    store: SharedCacheStore,
}

impl LocalCache {
    pub fn new(store: SharedCacheStore) -> Self {
        Self { store }
    }

    /// Read and decode the value under `key`
    pub async fn read<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let storage_key = key.to_string();

        let value = match self.store.get(&storage_key).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key = %storage_key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(source) => {
                let e = CacheError::Decode {
                    key: storage_key.clone(),
                    source,
                };
                warn!(key = %storage_key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Encode and store `value` under `key`
    pub async fn write<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let storage_key = key.to_string();

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(source) => {
                let e = CacheError::Encode {
                    key: storage_key.clone(),
                    source,
                };
                warn!(key = %storage_key, error = %e, "Cache write skipped");
                return;
            }
        };

        if let Err(e) = self.store.set(&storage_key, value).await {
            warn!(key = %storage_key, error = %e, "Cache write failed");
        }
    }

    pub async fn remove(&self, key: &CacheKey) {
        let storage_key = key.to_string();
        if let Err(e) = self.store.delete(&storage_key).await {
            warn!(key = %storage_key, error = %e, "Cache delete failed");
        }
    }

    pub async fn categories(&self) -> Option<Vec<Category>> {
        self.read(&CacheKey::Categories).await
    }

    pub async fn set_categories(&self, categories: &[Category]) {
        self.write(&CacheKey::Categories, &categories).await;
    }

    pub async fn podcasts(&self, bucket: Bucket) -> Option<Vec<Podcast>> {
        self.read(&CacheKey::Podcasts(bucket)).await
    }

    pub async fn set_podcasts(&self, bucket: Bucket, podcasts: &[Podcast]) {
        self.write(&CacheKey::Podcasts(bucket), &podcasts).await;
    }

    pub async fn feed(&self, rss_url: &str) -> Option<PodcastFeed> {
        self.read(&CacheKey::feed(rss_url)).await
    }

    /// Store a feed under its own link
    pub async fn set_feed(&self, feed: &PodcastFeed) {
        self.write(&CacheKey::feed(feed.link.as_str()), feed).await;
    }

    pub async fn listen(&self, episode_url: &str) -> Option<Listen> {
        self.read(&CacheKey::position(episode_url)).await
    }

    /// Store a listen record and mirror it into the cached feed, if any
    ///
    /// Both writes have completed when this returns.
    pub async fn set_listen(&self, listen: &Listen) {
        self.write(&CacheKey::position(listen.episode_url.as_str()), listen)
            .await;

        if let Some(mut feed) = self.feed(&listen.rss_url).await {
            if feed.apply_listen(listen) {
                self.set_feed(&feed).await;
            } else {
                debug!(
                    rss_url = %listen.rss_url,
                    episode_url = %listen.episode_url,
                    "Cached feed has no matching episode"
                );
            }
        }
    }

    pub async fn current_episode(&self) -> Option<PodcastEpisode> {
        self.read(&CacheKey::CurrentEpisode).await
    }

    /// Replace the current-episode pointer; `None` clears it
    pub async fn set_current_episode(&self, episode: Option<&PodcastEpisode>) {
        match episode {
            Some(episode) => self.write(&CacheKey::CurrentEpisode, episode).await,
            None => self.remove(&CacheKey::CurrentEpisode).await,
        }
    }
}
