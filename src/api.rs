// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Remote API client for the podcast backend
//!
//! Each operation maps onto one HTTP call. Reads decode the JSON body on a
//! 2xx answer and return an [`ApiError`] for anything else: transport
//! failures, other statuses and bodies of the wrong shape alike. Calls
//! without a token are sent without an `Authorization` header.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::model::{Category, Listen, Podcast, PodcastEpisode, PodcastFeed};

const CATEGORIES: &str = "categories";
const TOP: &str = "top";
const SEARCH: &str = "search";
const PARSE: &str = "parse";
const SUBSCRIPTIONS: &str = "subscriptions";
const LISTEN: &str = "listen";

/// Typed wrapper over the backend's REST endpoints
#[derive(Clone)]
pub struct ApiClient<C> {
    http: C,
    base_url: Url,
}

impl<C: HttpClient> ApiClient<C> {
    /// Create a client rooted at `base_url`
    ///
    /// Endpoint paths are resolved relative to the base, so a missing
    /// trailing slash is added.
    pub fn new(http: C, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint(CATEGORIES, &[])?;
        self.get_json(url, None).await
    }

    pub async fn get_top_podcasts(&self) -> Result<Vec<Podcast>, ApiError> {
        let url = self.endpoint(TOP, &[])?;
        self.get_json(url, None).await
    }

    pub async fn get_podcasts_by_category(&self, category_id: i64) -> Result<Vec<Podcast>, ApiError> {
        let id = category_id.to_string();
        let url = self.endpoint(TOP, &[("categoryId", &id)])?;
        self.get_json(url, None).await
    }

    pub async fn search_podcasts(&self, term: &str) -> Result<Vec<Podcast>, ApiError> {
        let url = self.endpoint(SEARCH, &[("term", term)])?;
        self.get_json(url, None).await
    }

    /// Parse a feed server-side; the token lets the server fill in usage data
    pub async fn parse_feed(&self, rss_url: &str, token: Option<&str>) -> Result<PodcastFeed, ApiError> {
        let url = self.endpoint(PARSE, &[("rssUrl", rss_url)])?;
        self.get_json(url, token).await
    }

    pub async fn get_subscriptions(&self, token: &str) -> Result<Vec<Podcast>, ApiError> {
        let url = self.endpoint(SUBSCRIPTIONS, &[])?;
        self.get_json(url, Some(token)).await
    }

    pub async fn add_subscription(&self, token: &str, podcast: &Podcast) -> Result<(), ApiError> {
        let url = self.endpoint(SUBSCRIPTIONS, &[])?;
        let body = encode(podcast)?;
        self.execute(Method::Post, url, Some(token), Some(body)).await?;
        Ok(())
    }

    pub async fn delete_subscription(&self, token: &str, rss_url: &str) -> Result<(), ApiError> {
        let url = self.endpoint(SUBSCRIPTIONS, &[("rssUrl", rss_url)])?;
        self.execute(Method::Delete, url, Some(token), None).await?;
        Ok(())
    }

    /// Listen record for one episode; `None` if the server has none
    ///
    /// The query parameter is named `rssUrl` by the backend but carries the
    /// episode's media URL.
    pub async fn get_listen_info(&self, token: &str, episode_url: &str) -> Result<Option<Listen>, ApiError> {
        let url = self.endpoint(LISTEN, &[("rssUrl", episode_url)])?;
        self.get_optional_json(url, Some(token)).await
    }

    pub async fn set_listen_info(&self, token: &str, listen: &Listen) -> Result<(), ApiError> {
        let url = self.endpoint(LISTEN, &[])?;
        let body = encode(listen)?;
        self.execute(Method::Put, url, Some(token), Some(body)).await?;
        Ok(())
    }

    /// The episode the user most recently listened to, if any
    pub async fn get_latest_episode(&self, token: &str) -> Result<Option<PodcastEpisode>, ApiError> {
        let url = self.endpoint(LISTEN, &[])?;
        self.get_optional_json(url, Some(token)).await
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        token: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, ApiError> {
        let url_string = url.to_string();
        debug!(?method, url = %url_string, authenticated = token.is_some(), "API request");

        let response = self
            .http
            .send(HttpRequest {
                method,
                url,
                bearer: token.map(String::from),
                body,
            })
            .await
            .map_err(|e| ApiError::Transport {
                url: url_string.clone(),
                source: e,
            })?;

        if !response.is_success() {
            return Err(ApiError::Status {
                url: url_string,
                status: response.status,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, token: Option<&str>) -> Result<T, ApiError> {
        let url_string = url.to_string();
        let response = self.execute(Method::Get, url, token, None).await?;

        serde_json::from_slice(&response.body).map_err(|e| ApiError::Malformed {
            url: url_string,
            source: e,
        })
    }

    async fn get_optional_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: Option<&str>,
    ) -> Result<Option<T>, ApiError> {
        let url_string = url.to_string();
        let response = self.execute(Method::Get, url, token, None).await?;

        if response.status == 204 || response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&response.body).map_err(|e| ApiError::Malformed {
            url: url_string,
            source: e,
        })
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Bytes, ApiError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(ApiError::Encode)
}
