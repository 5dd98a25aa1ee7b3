//! Spotify Web API provider.
//!
//! Authenticates with a long-lived refresh token and fetches the currently
//! playing track, the recently played history and per-track audio features.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::models::{AudioFeatures, TrackRecord, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TRACK};
use super::provider::{ProviderError, TrackProvider};
use super::token_cache::{AccessToken, TokenCache, TokenSource};
use crate::server::metrics::record_provider_request;

pub const SPOTIFY_SERVICE: &str = "Spotify";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Spotify caps the recently-played endpoint at 50 items.
const MAX_RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl SpotifyCredentials {
    /// Returns credentials only if every part is non-empty.
    pub fn new(client_id: &str, client_secret: &str, refresh_token: &str) -> Option<Self> {
        if client_id.is_empty() || client_secret.is_empty() || refresh_token.is_empty() {
            return None;
        }
        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
        })
    }

    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }
}

/// Exchanges the refresh token for a short-lived access token.
pub struct SpotifyTokenSource {
    client: Client,
    credentials: SpotifyCredentials,
    token_url: String,
}

impl SpotifyTokenSource {
    pub fn new(client: Client, credentials: SpotifyCredentials, token_url: impl Into<String>) -> Self {
        Self {
            client,
            credentials,
            token_url: token_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

fn auth_error(details: impl Into<String>) -> ProviderError {
    ProviderError::Authentication {
        service: SPOTIFY_SERVICE.to_string(),
        details: details.into(),
    }
}

#[async_trait]
impl TokenSource for SpotifyTokenSource {
    async fn fetch_token(&self) -> Result<AccessToken, ProviderError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .header("Authorization", self.credentials.basic_auth_header())
            .form(&form)
            .send()
            .await
            .map_err(|e| auth_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Spotify token refresh failed with status {}", status);
            return Err(auth_error(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error(format!("Unreadable token response: {}", e)))?;

        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| auth_error("No access token in response"))?;

        Ok(AccessToken {
            value,
            expires_in: body.expires_in.map(Duration::from_secs),
        })
    }
}

// Spotify API types

#[derive(Debug, Deserialize)]
struct CurrentlyPlayingResponse {
    #[serde(default)]
    is_playing: bool,
    item: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayedResponse {
    #[serde(default)]
    items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Deserialize)]
struct PlayHistoryItem {
    track: SpotifyTrack,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<SearchTracks>,
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: Option<String>,
    uri: Option<String>,
    name: Option<String>,
    album: Option<SpotifyAlbum>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    name: Option<String>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: Option<String>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AudioFeaturesResponse {
    tempo: Option<f64>,
    energy: Option<f64>,
    danceability: Option<f64>,
    valence: Option<f64>,
    loudness: Option<f64>,
}

impl SpotifyTrack {
    fn track_id(&self) -> Option<String> {
        self.id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.uri
                    .as_deref()
                    .and_then(|uri| uri.strip_prefix("spotify:track:"))
                    .map(str::to_string)
            })
    }

    fn external_url(&self) -> Option<String> {
        self.external_urls.as_ref().and_then(|u| u.spotify.clone())
    }

    fn into_track_record(self, is_playing: bool) -> TrackRecord {
        let track_id = self.track_id();
        let track_url = self.external_url().unwrap_or_default();

        // Prefer the medium sized image (index 1), then whatever is there.
        let album_art_url = self.album.as_ref().and_then(|album| {
            album
                .images
                .get(1)
                .or_else(|| album.images.first())
                .map(|image| image.url.clone())
        });
        let album_name = self
            .album
            .and_then(|album| album.name)
            .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

        let first_artist = self.artists.into_iter().next();
        let artist_url = first_artist
            .as_ref()
            .and_then(|a| a.external_urls.as_ref())
            .and_then(|u| u.spotify.clone())
            .unwrap_or_default();
        let artist_name = first_artist
            .and_then(|a| a.name)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        TrackRecord {
            is_playing,
            track_name: self.name.unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            artist_name,
            album_name,
            album_art_url,
            track_url,
            artist_url,
            track_id,
            audio_features: None,
        }
    }
}

/// Result of looking a track up by artist and title.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyTrackMatch {
    pub track_id: Option<String>,
    pub track_url: Option<String>,
}

pub struct SpotifyProvider {
    client: Client,
    api_base: String,
    tokens: Option<Arc<TokenCache>>,
}

impl SpotifyProvider {
    /// Create a provider against the public Spotify endpoints.
    ///
    /// Passing `None` credentials yields an unconfigured provider.
    pub fn new(client: Client, credentials: Option<SpotifyCredentials>) -> Self {
        Self::with_endpoints(client, credentials, DEFAULT_API_BASE, DEFAULT_TOKEN_URL)
    }

    pub fn with_endpoints(
        client: Client,
        credentials: Option<SpotifyCredentials>,
        api_base: &str,
        token_url: &str,
    ) -> Self {
        let tokens = credentials.map(|credentials| {
            Arc::new(TokenCache::new(Box::new(SpotifyTokenSource::new(
                client.clone(),
                credentials,
                token_url,
            ))))
        });
        Self::with_token_cache(client, api_base, tokens)
    }

    /// Create a provider around an existing token cache.
    pub fn with_token_cache(client: Client, api_base: &str, tokens: Option<Arc<TokenCache>>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn tokens(&self) -> Result<&Arc<TokenCache>, ProviderError> {
        self.tokens.as_ref().ok_or_else(|| ProviderError::NotConfigured {
            service: SPOTIFY_SERVICE.to_string(),
        })
    }

    /// Authenticated GET. `Ok(None)` means the API answered with no content.
    ///
    /// A 401 invalidates the cached token and retries once.
    async fn api_get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let tokens = self.tokens()?;
        let url = format!("{}{}", self.api_base, path);

        for attempt in 0..2 {
            let token = tokens.get().await?;
            let response = self
                .client
                .get(&url)
                .query(query)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| {
                    record_provider_request("spotify", "transport_error");
                    ProviderError::Api {
                        service: SPOTIFY_SERVICE.to_string(),
                        status: 0,
                        message: e.to_string(),
                    }
                })?;

            let status = response.status();
            record_provider_request("spotify", status.as_str());

            if status == StatusCode::UNAUTHORIZED {
                if attempt == 0 {
                    debug!("Spotify rejected the access token, refreshing and retrying");
                    tokens.invalidate().await;
                    continue;
                }
                return Err(auth_error("Access token rejected after refresh"));
            }
            if status == StatusCode::NO_CONTENT {
                return Ok(None);
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api {
                    service: SPOTIFY_SERVICE.to_string(),
                    status: status.as_u16(),
                    message: body,
                });
            }

            let body = response.text().await.map_err(|e| ProviderError::InvalidResponse {
                service: SPOTIFY_SERVICE.to_string(),
                details: e.to_string(),
            })?;
            if body.trim().is_empty() {
                return Ok(None);
            }
            return serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| ProviderError::InvalidResponse {
                    service: SPOTIFY_SERVICE.to_string(),
                    details: e.to_string(),
                });
        }

        Err(auth_error("Access token rejected after refresh"))
    }

    /// Audio features for a track. Unavailable features are not an error.
    pub async fn audio_features(&self, track_id: &str) -> Option<AudioFeatures> {
        if track_id.is_empty() {
            return None;
        }
        let path = format!("/audio-features/{}", urlencoding::encode(track_id));
        match self.api_get::<AudioFeaturesResponse>(&path, &[]).await {
            Ok(Some(features)) => {
                let defaults = AudioFeatures {
                    tempo: 120.0,
                    energy: 0.5,
                    danceability: 0.5,
                    valence: 0.5,
                    loudness: -10.0,
                };
                Some(AudioFeatures {
                    tempo: features.tempo.unwrap_or(defaults.tempo),
                    energy: features.energy.unwrap_or(defaults.energy),
                    danceability: features.danceability.unwrap_or(defaults.danceability),
                    valence: features.valence.unwrap_or(defaults.valence),
                    loudness: features.loudness.unwrap_or(defaults.loudness),
                })
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Audio features unavailable for {}: {}", track_id, e);
                None
            }
        }
    }

    /// Looks a track up by artist and title.
    pub async fn search_track(
        &self,
        artist_name: &str,
        track_name: &str,
    ) -> Result<Option<SpotifyTrackMatch>, ProviderError> {
        let query = [
            ("q", format!("artist:{} track:{}", artist_name, track_name)),
            ("type", "track".to_string()),
            ("limit", "1".to_string()),
        ];
        let response: Option<SearchResponse> = self.api_get("/search", &query).await?;

        Ok(response
            .and_then(|r| r.tracks)
            .and_then(|t| t.items.into_iter().next())
            .map(|track| SpotifyTrackMatch {
                track_id: track.track_id(),
                track_url: track.external_url().filter(|u| !u.is_empty()),
            }))
    }
}

#[async_trait]
impl TrackProvider for SpotifyProvider {
    fn name(&self) -> &str {
        SPOTIFY_SERVICE
    }

    fn is_configured(&self) -> bool {
        self.tokens.is_some()
    }

    async fn currently_playing(&self) -> Result<Option<TrackRecord>, ProviderError> {
        let response: Option<CurrentlyPlayingResponse> = self
            .api_get("/me/player/currently-playing", &[])
            .await?;

        Ok(response.and_then(|r| {
            let is_playing = r.is_playing;
            r.item.map(|item| item.into_track_record(is_playing))
        }))
    }

    async fn recent_tracks(&self, limit: usize) -> Result<Vec<TrackRecord>, ProviderError> {
        let limit = limit.clamp(1, MAX_RECENT_LIMIT);
        let response: Option<RecentlyPlayedResponse> = self
            .api_get("/me/player/recently-played", &[("limit", limit.to_string())])
            .await?;

        Ok(response
            .map(|r| r.items)
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.track.into_track_record(false))
            .collect())
    }

    async fn enrich(&self, mut track: TrackRecord) -> TrackRecord {
        if track.audio_features.is_none() {
            if let Some(track_id) = track.track_id.clone() {
                track.audio_features = self.audio_features(&track_id).await;
            }
        }
        track
    }
}
