use serde::{Deserialize, Serialize};

use super::PodcastEpisode;

/// Playback progress for one episode, as written to the listen endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listen {
    pub rss_url: String,
    pub episode_url: String,
    #[serde(default)]
    pub episode_name: String,
    pub time: f64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub duration: f64,
}

impl Listen {
    /// Snapshot the progress fields of an episode
    pub fn from_episode(episode: &PodcastEpisode) -> Self {
        Self {
            rss_url: episode.rss_url.clone(),
            episode_url: episode.content.clone(),
            episode_name: episode.title.clone(),
            time: episode.time,
            is_completed: episode.is_completed,
            duration: episode.duration,
        }
    }

    /// A record marking the episode as fully played or reset to the start
    pub fn with_completion(episode: &PodcastEpisode, completed: bool) -> Self {
        Self {
            time: if completed { episode.duration } else { 0.0 },
            is_completed: completed,
            ..Self::from_episode(episode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_episode() -> PodcastEpisode {
        PodcastEpisode {
            content: "https://example.com/ep1.mp3".to_string(),
            title: "Episode 1".to_string(),
            rss_url: "https://example.com/feed.xml".to_string(),
            image_url: String::new(),
            description: String::new(),
            publishing_date: None,
            author: String::new(),
            time: 42.0,
            duration: 1800.0,
            is_completed: false,
            store_locally: false,
        }
    }

    #[test]
    fn from_episode_maps_identity_and_progress() {
        let listen = Listen::from_episode(&make_episode());

        assert_eq!(listen.rss_url, "https://example.com/feed.xml");
        assert_eq!(listen.episode_url, "https://example.com/ep1.mp3");
        assert_eq!(listen.episode_name, "Episode 1");
        assert_eq!(listen.time, 42.0);
        assert_eq!(listen.duration, 1800.0);
        assert!(!listen.is_completed);
    }

    #[test]
    fn completion_sets_time_to_duration() {
        let listen = Listen::with_completion(&make_episode(), true);
        assert!(listen.is_completed);
        assert_eq!(listen.time, 1800.0);

        let reset = Listen::with_completion(&make_episode(), false);
        assert!(!reset.is_completed);
        assert_eq!(reset.time, 0.0);
    }

    #[test]
    fn serializes_with_backend_field_names() {
        let json = serde_json::to_value(Listen::from_episode(&make_episode())).unwrap();
        assert_eq!(json["episodeUrl"], "https://example.com/ep1.mp3");
        assert_eq!(json["isCompleted"], false);
    }
}
