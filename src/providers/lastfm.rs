//! Last.fm scrobble history provider.
//!
//! Last.fm has no audio analysis, so the rendered track is cross-referenced
//! against Spotify (when configured) for audio features and a playable link,
//! and against Deezer for album art when Last.fm only has its placeholder.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use super::deezer::DeezerClient;
use super::models::{AudioFeatures, TrackRecord, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TRACK};
use super::provider::{ProviderError, TrackProvider};
use super::spotify::SpotifyProvider;
use crate::server::metrics::record_provider_request;

pub const LASTFM_SERVICE: &str = "Last.fm";
pub const DEFAULT_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Image hash Last.fm serves when it has no real album art.
const PLACEHOLDER_IMAGE_HASH: &str = "2a96cbd8b46e442fc41c2b86b821562f";

const MAX_RECENT_LIMIT: usize = 200;

/// Image sizes in order of preference.
const IMAGE_SIZE_PRIORITY: [&str; 4] = ["extralarge", "large", "medium", "small"];

#[derive(Debug, Clone, PartialEq)]
pub struct LastFmCredentials {
    pub api_key: String,
    pub username: String,
}

impl LastFmCredentials {
    pub fn new(api_key: &str, username: &str) -> Option<Self> {
        if api_key.is_empty() || username.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
            username: username.to_string(),
        })
    }
}

// Last.fm API types

#[derive(Debug, Deserialize)]
struct RecentTracksEnvelope {
    recenttracks: Option<RecentTracks>,
}

#[derive(Debug, Deserialize)]
struct RecentTracks {
    #[serde(default)]
    track: OneOrMany<LastFmTrack>,
}

/// Last.fm collapses single-element lists into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct LastFmTrack {
    name: Option<String>,
    artist: Option<LastFmArtist>,
    album: Option<TextNode>,
    #[serde(default)]
    image: Vec<LastFmImage>,
    url: Option<String>,
    #[serde(rename = "@attr")]
    attr: Option<TrackAttr>,
}

/// The artist is an object in extended responses and a plain string in
/// some older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LastFmArtist {
    Name(String),
    Object {
        name: Option<String>,
        #[serde(rename = "#text")]
        text: Option<String>,
        url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct TextNode {
    #[serde(rename = "#text")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LastFmImage {
    size: Option<String>,
    #[serde(rename = "#text")]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackAttr {
    nowplaying: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn best_image_url(images: &[LastFmImage]) -> Option<String> {
    let url_of = |image: &LastFmImage| image.url.clone().filter(|u| !u.is_empty());

    IMAGE_SIZE_PRIORITY
        .iter()
        .find_map(|size| {
            images
                .iter()
                .filter(|image| image.size.as_deref() == Some(*size))
                .find_map(url_of)
        })
        .or_else(|| images.iter().find_map(url_of))
}

fn artist_page_url(artist_name: &str) -> String {
    format!("https://www.last.fm/music/{}", artist_name.replace(' ', "+"))
}

impl LastFmTrack {
    fn is_now_playing(&self) -> bool {
        self.attr
            .as_ref()
            .and_then(|attr| attr.nowplaying.as_deref())
            .is_some_and(|flag| flag == "true")
    }

    fn into_track_record(self) -> TrackRecord {
        let is_playing = self.is_now_playing();

        let album_art_url =
            best_image_url(&self.image).filter(|url| !url.contains(PLACEHOLDER_IMAGE_HASH));

        let (artist_name, artist_url) = match self.artist {
            Some(LastFmArtist::Name(name)) => (non_empty(Some(name)), None),
            Some(LastFmArtist::Object { name, text, url }) => {
                (non_empty(name).or_else(|| non_empty(text)), non_empty(url))
            }
            None => (None, None),
        };
        let artist_url = match (&artist_url, &artist_name) {
            (Some(url), _) => url.clone(),
            (None, Some(name)) => artist_page_url(name),
            (None, None) => String::new(),
        };

        TrackRecord {
            is_playing,
            track_name: non_empty(self.name).unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            artist_name: artist_name.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album_name: non_empty(self.album.and_then(|album| album.text))
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            album_art_url,
            track_url: self.url.unwrap_or_default(),
            artist_url,
            track_id: None,
            audio_features: None,
        }
    }
}

/// Parses a `user.getrecenttracks` payload.
///
/// Last.fm reports some failures with HTTP 200 and an `error` field.
fn parse_recent_tracks(body: serde_json::Value) -> Result<Vec<TrackRecord>, ProviderError> {
    if let Some(code) = body.get("error") {
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(ProviderError::Api {
            service: LASTFM_SERVICE.to_string(),
            status: code.as_u64().and_then(|c| u16::try_from(c).ok()).unwrap_or(0),
            message,
        });
    }

    let envelope: RecentTracksEnvelope =
        serde_json::from_value(body).map_err(|e| ProviderError::InvalidResponse {
            service: LASTFM_SERVICE.to_string(),
            details: e.to_string(),
        })?;

    Ok(envelope
        .recenttracks
        .map(|recent| recent.track.into_vec())
        .unwrap_or_default()
        .into_iter()
        .map(LastFmTrack::into_track_record)
        .collect())
}

fn spotify_search_url(artist_name: &str, track_name: &str) -> String {
    format!(
        "https://open.spotify.com/search/{}",
        urlencoding::encode(&format!("{} {}", artist_name, track_name))
    )
}

pub struct LastFmProvider {
    client: Client,
    credentials: Option<LastFmCredentials>,
    api_url: String,
    deezer: DeezerClient,
    spotify: Option<Arc<SpotifyProvider>>,
}

impl LastFmProvider {
    pub fn new(client: Client, credentials: Option<LastFmCredentials>) -> Self {
        let deezer = DeezerClient::new(client.clone());
        Self {
            client,
            credentials,
            api_url: DEFAULT_API_URL.to_string(),
            deezer,
            spotify: None,
        }
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }

    pub fn with_deezer(mut self, deezer: DeezerClient) -> Self {
        self.deezer = deezer;
        self
    }

    /// Use Spotify to look up audio features and links for rendered tracks.
    pub fn with_spotify(mut self, spotify: Arc<SpotifyProvider>) -> Self {
        self.spotify = Some(spotify);
        self
    }

    fn credentials(&self) -> Result<&LastFmCredentials, ProviderError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured {
                service: LASTFM_SERVICE.to_string(),
            })
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TrackRecord>, ProviderError> {
        let credentials = self.credentials()?;
        let limit = limit.clamp(1, MAX_RECENT_LIMIT).to_string();
        let query = [
            ("method", "user.getrecenttracks"),
            ("user", credentials.username.as_str()),
            ("limit", limit.as_str()),
            ("extended", "1"),
            ("api_key", credentials.api_key.as_str()),
            ("format", "json"),
        ];

        let response = self
            .client
            .get(&self.api_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                record_provider_request("lastfm", "transport_error");
                ProviderError::Api {
                    service: LASTFM_SERVICE.to_string(),
                    status: 0,
                    message: e.to_string(),
                }
            })?;

        let status = response.status();
        record_provider_request("lastfm", status.as_str());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                service: LASTFM_SERVICE.to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    service: LASTFM_SERVICE.to_string(),
                    details: e.to_string(),
                })?;

        parse_recent_tracks(body)
    }

    /// Audio features and a Spotify link for a track, looked up by name.
    ///
    /// When the search fails or finds nothing the link points at a Spotify
    /// search page, so the widget still leads somewhere playable.
    async fn spotify_details(
        &self,
        spotify: &SpotifyProvider,
        artist_name: &str,
        track_name: &str,
    ) -> (Option<AudioFeatures>, String) {
        let fallback_url = spotify_search_url(artist_name, track_name);

        match spotify.search_track(artist_name, track_name).await {
            Ok(Some(found)) => {
                let url = found.track_url.unwrap_or(fallback_url);
                let features = match found.track_id {
                    Some(id) => spotify.audio_features(&id).await,
                    None => None,
                };
                (features, url)
            }
            Ok(None) => (None, fallback_url),
            Err(e) => {
                debug!("Spotify lookup for Last.fm track failed: {}", e);
                (None, fallback_url)
            }
        }
    }
}

#[async_trait]
impl TrackProvider for LastFmProvider {
    fn name(&self) -> &str {
        LASTFM_SERVICE
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    async fn currently_playing(&self) -> Result<Option<TrackRecord>, ProviderError> {
        let latest = self.fetch_recent(1).await?.into_iter().next();
        Ok(latest.filter(|track| track.is_playing))
    }

    async fn recent_tracks(&self, limit: usize) -> Result<Vec<TrackRecord>, ProviderError> {
        self.fetch_recent(limit).await
    }

    async fn enrich(&self, mut track: TrackRecord) -> TrackRecord {
        if track.album_art_url.is_none() {
            track.album_art_url = self
                .deezer
                .find_album_art(&track.artist_name, &track.track_name)
                .await;
        }

        let spotify = self.spotify.as_ref().filter(|s| s.is_configured());
        if let Some(spotify) = spotify {
            let (features, url) = self
                .spotify_details(spotify, &track.artist_name, &track.track_name)
                .await;
            track.audio_features = features;
            if !url.is_empty() {
                track.track_url = url;
            }
        }

        if track.audio_features.is_none() {
            track.audio_features = Some(AudioFeatures::ESTIMATED);
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_track() -> serde_json::Value {
        json!({
            "name": "Bohemian Rhapsody",
            "artist": {"name": "Queen", "url": "https://www.last.fm/music/Queen"},
            "album": {"#text": "A Night at the Opera"},
            "image": [
                {"size": "small", "#text": "https://img/s.png"},
                {"size": "extralarge", "#text": "https://img/xl.png"},
                {"size": "large", "#text": "https://img/l.png"}
            ],
            "url": "https://www.last.fm/music/Queen/_/Bohemian+Rhapsody",
            "@attr": {"nowplaying": "true"}
        })
    }

    #[test]
    fn parses_track_list() {
        let body = json!({"recenttracks": {"track": [sample_track(), {"name": "Other", "artist": "Someone"}]}});
        let tracks = parse_recent_tracks(body).unwrap();

        assert_eq!(tracks.len(), 2);
        let first = &tracks[0];
        assert!(first.is_playing);
        assert_eq!(first.track_name, "Bohemian Rhapsody");
        assert_eq!(first.artist_name, "Queen");
        assert_eq!(first.album_name, "A Night at the Opera");
        assert_eq!(first.album_art_url.as_deref(), Some("https://img/xl.png"));
        assert_eq!(first.artist_url, "https://www.last.fm/music/Queen");

        let second = &tracks[1];
        assert!(!second.is_playing);
        assert_eq!(second.artist_name, "Someone");
        assert_eq!(second.artist_url, "https://www.last.fm/music/Someone");
        assert_eq!(second.album_name, UNKNOWN_ALBUM);
        assert_eq!(second.album_art_url, None);
    }

    #[test]
    fn parses_single_track_object() {
        let body = json!({"recenttracks": {"track": sample_track()}});
        let tracks = parse_recent_tracks(body).unwrap();
        assert_eq!(tracks.len(), 1);
    }

    #[test]
    fn empty_history_parses_to_no_tracks() {
        let body = json!({"recenttracks": {"track": [], "@attr": {"total": "0"}}});
        assert!(parse_recent_tracks(body).unwrap().is_empty());
    }

    #[test]
    fn error_payload_becomes_api_error() {
        let body = json!({"error": 6, "message": "User not found"});
        assert_eq!(
            parse_recent_tracks(body),
            Err(ProviderError::Api {
                service: LASTFM_SERVICE.to_string(),
                status: 6,
                message: "User not found".to_string(),
            })
        );
    }

    #[test]
    fn placeholder_artwork_is_discarded() {
        let body = json!({"recenttracks": {"track": {
            "name": "Song",
            "artist": {"#text": "Band Name"},
            "image": [{"size": "extralarge", "#text": format!("https://lastfm.freetls.fastly.net/i/u/300x300/{}.png", PLACEHOLDER_IMAGE_HASH)}]
        }}});
        let track = parse_recent_tracks(body).unwrap().remove(0);
        assert_eq!(track.album_art_url, None);
        assert_eq!(track.artist_name, "Band Name");
        assert_eq!(track.artist_url, "https://www.last.fm/music/Band+Name");
    }

    #[test]
    fn unsized_images_used_as_last_resort() {
        let images = vec![
            LastFmImage {
                size: Some("mega".to_string()),
                url: Some(String::new()),
            },
            LastFmImage {
                size: None,
                url: Some("https://img/any.png".to_string()),
            },
        ];
        assert_eq!(best_image_url(&images).as_deref(), Some("https://img/any.png"));
    }

    #[test]
    fn spotify_search_fallback_is_url_encoded() {
        assert_eq!(
            spotify_search_url("Queen", "Don't Stop Me Now"),
            "https://open.spotify.com/search/Queen%20Don%27t%20Stop%20Me%20Now"
        );
    }

    #[test]
    fn credentials_require_key_and_user() {
        assert!(LastFmCredentials::new("key", "user").is_some());
        assert!(LastFmCredentials::new("", "user").is_none());
        assert!(LastFmCredentials::new("key", "").is_none());
    }

    #[tokio::test]
    async fn enrich_without_spotify_uses_estimated_features() {
        let provider = LastFmProvider::new(Client::new(), None)
            .with_deezer(DeezerClient::with_search_url(Client::new(), "http://127.0.0.1:1/search"));
        let track = TrackRecord {
            is_playing: true,
            track_name: "Song".to_string(),
            artist_name: "Band".to_string(),
            album_name: UNKNOWN_ALBUM.to_string(),
            album_art_url: Some("https://img/cover.png".to_string()),
            track_url: "https://www.last.fm/music/Band/_/Song".to_string(),
            artist_url: String::new(),
            track_id: None,
            audio_features: None,
        };

        let enriched = provider.enrich(track).await;
        assert_eq!(enriched.audio_features, Some(AudioFeatures::ESTIMATED));
        assert_eq!(enriched.track_url, "https://www.last.fm/music/Band/_/Song");
        assert_eq!(enriched.album_art_url.as_deref(), Some("https://img/cover.png"));
    }
}
