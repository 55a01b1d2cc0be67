// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use super::{Listen, PodcastEpisode};

/// A server-parsed RSS feed, identified by its `link` (the RSS URL)
///
/// `items` keep the order the server delivered them in, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastFeed {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub copyright: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub items: Vec<PodcastEpisode>,
}

impl PodcastFeed {
    /// Find the episode whose media URL matches `content`
    pub fn episode(&self, content: &str) -> Option<&PodcastEpisode> {
        self.items.iter().find(|item| item.content == content)
    }

    /// Copy the progress fields of a listen record onto the matching episode
    ///
    /// Returns false if no episode in this feed matches the record.
    pub fn apply_listen(&mut self, listen: &Listen) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| item.content == listen.episode_url)
        {
            Some(item) => {
                item.time = listen.time;
                item.is_completed = listen.is_completed;
                item.duration = listen.duration;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_episode(content: &str) -> PodcastEpisode {
        PodcastEpisode {
            content: content.to_string(),
            title: content.to_string(),
            rss_url: "A".to_string(),
            image_url: String::new(),
            description: String::new(),
            publishing_date: None,
            author: String::new(),
            time: 0.0,
            duration: 0.0,
            is_completed: false,
            store_locally: false,
        }
    }

    fn make_feed() -> PodcastFeed {
        PodcastFeed {
            title: "Feed".to_string(),
            link: "A".to_string(),
            description: String::new(),
            copyright: String::new(),
            image_url: String::new(),
            is_subscribed: false,
            items: vec![make_episode("ep2"), make_episode("ep1")],
        }
    }

    #[test]
    fn apply_listen_patches_matching_episode_only() {
        let mut feed = make_feed();
        let listen = Listen {
            rss_url: "A".to_string(),
            episode_url: "ep1".to_string(),
            episode_name: "ep1".to_string(),
            time: 120.0,
            is_completed: false,
            duration: 3600.0,
        };

        assert!(feed.apply_listen(&listen));

        let ep1 = feed.episode("ep1").unwrap();
        assert_eq!(ep1.time, 120.0);
        assert_eq!(ep1.duration, 3600.0);
        assert_eq!(feed.episode("ep2").unwrap().time, 0.0);
        // Order is untouched
        assert_eq!(feed.items[0].content, "ep2");
    }

    #[test]
    fn apply_listen_reports_missing_episode() {
        let mut feed = make_feed();
        let listen = Listen {
            rss_url: "A".to_string(),
            episode_url: "unknown".to_string(),
            episode_name: String::new(),
            time: 5.0,
            is_completed: true,
            duration: 5.0,
        };

        assert!(!feed.apply_listen(&listen));
        assert_eq!(feed, make_feed());
    }
}
