pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod format;
pub mod http;
pub mod model;
pub mod player;
pub mod sync;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use api::ApiClient;
pub use auth::{Auth, IdentityProvider, TokenGrant, TokenWatch};
pub use cache::{Bucket, CacheKey, CacheStore, FileStore, LocalCache, MemoryStore, SharedCacheStore};
pub use error::{ApiError, AuthError, CacheError, TransportError};
pub use format::{format_time, release_date_text, remaining_text, strip_tags};
pub use http::{HttpClient, HttpRequest, HttpResponse, Method, OfflineClient, ReqwestClient};
pub use model::{Category, Listen, Podcast, PodcastEpisode, PodcastFeed};
pub use player::{ListenStore, LoadCause, MediaElement, PlaybackTracker, PlayerOptions, PlayerState};
pub use sync::{DataManager, Deliveries, Delivery, Generation, PendingWrite, Source};
