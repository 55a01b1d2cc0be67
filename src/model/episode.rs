use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single episode of a feed; `content` is the media URL and identifies it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastEpisode {
    pub content: String,
    pub title: String,
    pub rss_url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub publishing_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: String,
    /// Elapsed playback in seconds
    #[serde(default)]
    pub time: f64,
    /// Total length in seconds, zero when unknown
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub store_locally: bool,
}

impl PodcastEpisode {
    /// True if playback of this episode has never started
    pub fn is_unplayed(&self) -> bool {
        self.time == 0.0 && !self.is_completed
    }

    /// True if both values refer to the same media
    pub fn is_same_media(&self, other: &PodcastEpisode) -> bool {
        self.content == other.content
    }
}
