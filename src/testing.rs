//! Shared fixtures for unit tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::error::TransportError;
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::model::{Category, Listen, Podcast, PodcastEpisode, PodcastFeed};

pub const BASE_URL: &str = "https://api.example.com/";

#[derive(Default)]
struct MockState {
    routes: HashMap<(Method, String), (u16, Bytes)>,
    requests: Vec<HttpRequest>,
    offline: bool,
}

/// Canned-response HTTP client that records every request
///
/// Routes are matched on method plus path and query, e.g. `/top?categoryId=3`.
/// Unknown routes answer 404.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    state: Arc<Mutex<MockState>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, method: Method, route: &str, status: u16, body: &str) {
        self.state.lock().unwrap().routes.insert(
            (method, route.to_string()),
            (status, Bytes::from(body.to_string())),
        );
    }

    pub fn respond_json(&self, method: Method, route: &str, body: Value) {
        self.respond(method, route, 200, &body.to_string());
    }

    /// Fail every request at the transport level
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.url.path() == path)
            .collect()
    }
}

fn route_of(request: &HttpRequest) -> String {
    match request.url.query() {
        Some(query) => format!("{}?{}", request.url.path(), query),
        None => request.url.path().to_string(),
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if state.offline {
            return Err(TransportError::Offline);
        }

        let (status, body) = state
            .routes
            .get(&(request.method, route_of(&request)))
            .cloned()
            .unwrap_or((404, Bytes::new()));

        Ok(HttpResponse { status, body })
    }
}

pub fn make_category(id: i64, title: &str) -> Category {
    Category {
        id,
        title: title.to_string(),
        icon_url: format!("https://example.com/{id}.svg"),
    }
}

pub fn make_podcast(rss_url: &str) -> Podcast {
    Podcast {
        title: format!("Podcast {rss_url}"),
        rss_url: rss_url.to_string(),
        image_url: String::new(),
        is_subscribed: false,
    }
}

pub fn make_episode(rss_url: &str, content: &str) -> PodcastEpisode {
    PodcastEpisode {
        content: content.to_string(),
        title: format!("Episode {content}"),
        rss_url: rss_url.to_string(),
        image_url: String::new(),
        description: String::new(),
        publishing_date: None,
        author: "Host".to_string(),
        time: 0.0,
        duration: 3600.0,
        is_completed: false,
        store_locally: false,
    }
}

pub fn make_feed(link: &str, contents: &[&str]) -> PodcastFeed {
    PodcastFeed {
        title: format!("Feed {link}"),
        link: link.to_string(),
        description: String::new(),
        copyright: String::new(),
        image_url: String::new(),
        is_subscribed: false,
        items: contents.iter().map(|c| make_episode(link, c)).collect(),
    }
}

pub fn make_listen(rss_url: &str, episode_url: &str, time: f64, is_completed: bool) -> Listen {
    Listen {
        rss_url: rss_url.to_string(),
        episode_url: episode_url.to_string(),
        episode_name: format!("Episode {episode_url}"),
        time,
        is_completed,
        duration: 3600.0,
    }
}
