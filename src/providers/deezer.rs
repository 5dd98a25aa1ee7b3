//! Deezer catalog search, used only to find album art for tracks the
//! history provider has no artwork for. Deezer search needs no API key.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_SEARCH_URL: &str = "https://api.deezer.com/search";

const SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    album: Option<SearchAlbum>,
}

#[derive(Debug, Deserialize)]
struct SearchAlbum {
    cover_big: Option<String>,
}

#[derive(Clone)]
pub struct DeezerClient {
    client: Client,
    search_url: String,
}

impl DeezerClient {
    pub fn new(client: Client) -> Self {
        Self::with_search_url(client, DEFAULT_SEARCH_URL)
    }

    pub fn with_search_url(client: Client, search_url: &str) -> Self {
        Self {
            client,
            search_url: search_url.to_string(),
        }
    }

    /// Finds a cover image for a track.
    ///
    /// Tries a field-qualified search first, then a plain keyword search.
    /// Any failure yields `None`.
    pub async fn find_album_art(&self, artist_name: &str, track_name: &str) -> Option<String> {
        if artist_name.is_empty() || track_name.is_empty() {
            return None;
        }

        let strict = format!("artist:\"{}\" track:\"{}\"", artist_name, track_name);
        if let Some(url) = self.search_cover(&strict).await {
            return Some(url);
        }

        let relaxed = format!("{} {}", artist_name, track_name);
        self.search_cover(&relaxed).await
    }

    async fn search_cover(&self, query: &str) -> Option<String> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query), ("limit", "1")])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| debug!("Deezer search failed: {}", e))
            .ok()?;

        if !response.status().is_success() {
            debug!("Deezer search returned {}", response.status());
            return None;
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| debug!("Unreadable Deezer response: {}", e))
            .ok()?;

        body.data
            .into_iter()
            .next()
            .and_then(|hit| hit.album)
            .and_then(|album| album.cover_big)
            .filter(|url| !url.is_empty())
    }
}
