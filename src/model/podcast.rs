// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use super::PodcastFeed;

/// A browsable podcast category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub icon_url: String,
}

/// A subscribable show, identified by its RSS URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub title: String,
    pub rss_url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub is_subscribed: bool,
}

impl Podcast {
    /// Build the subscribable summary of a parsed feed
    pub fn from_feed(feed: &PodcastFeed) -> Self {
        Self {
            title: feed.title.clone(),
            rss_url: feed.link.clone(),
            image_url: feed.image_url.clone(),
            is_subscribed: feed.is_subscribed,
        }
    }
}
