use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use now_playing_widget::providers::{
    AudioFeatures, ProviderError, TrackProvider, TrackRecord, UNKNOWN_ALBUM,
};
use now_playing_widget::widget::{ArtworkFetcher, ImageError};
use std::collections::HashMap;
use std::io::Cursor;

/// PNG bytes of a square of one color.
pub fn solid_png(r: u8, g: u8, b: u8) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([r, g, b])));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode test PNG");
    bytes.into_inner()
}

/// Serves canned tracks without touching the network.
pub struct FakeProvider {
    pub name: String,
    pub configured: bool,
    pub playing: Option<TrackRecord>,
    pub history: Vec<TrackRecord>,
    pub failure: Option<ProviderError>,
}

impl FakeProvider {
    pub fn playing(track: TrackRecord) -> Self {
        Self {
            name: "Fake".to_string(),
            configured: true,
            playing: Some(track),
            history: Vec::new(),
            failure: None,
        }
    }

    pub fn history(tracks: Vec<TrackRecord>) -> Self {
        Self {
            name: "Fake".to_string(),
            configured: true,
            playing: None,
            history: tracks,
            failure: None,
        }
    }

    pub fn failing(failure: ProviderError) -> Self {
        Self {
            name: "Fake".to_string(),
            configured: true,
            playing: None,
            history: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::history(Vec::new())
        }
    }

    pub fn track(title: &str, artist: &str, art_url: Option<&str>) -> TrackRecord {
        TrackRecord {
            is_playing: true,
            track_name: title.to_string(),
            artist_name: artist.to_string(),
            album_name: UNKNOWN_ALBUM.to_string(),
            album_art_url: art_url.map(str::to_string),
            track_url: format!("https://example.com/track/{}", title),
            artist_url: format!("https://example.com/artist/{}", artist),
            track_id: None,
            audio_features: Some(AudioFeatures {
                tempo: 128.0,
                energy: 0.8,
                ..AudioFeatures::ESTIMATED
            }),
        }
    }
}

#[async_trait]
impl TrackProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn currently_playing(&self) -> Result<Option<TrackRecord>, ProviderError> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(self.playing.clone()),
        }
    }

    async fn recent_tracks(&self, limit: usize) -> Result<Vec<TrackRecord>, ProviderError> {
        Ok(self
            .history
            .iter()
            .take(limit)
            .cloned()
            .map(|mut t| {
                t.is_playing = false;
                t
            })
            .collect())
    }
}

/// Serves image bytes by URL; unknown URLs answer 404.
#[derive(Default)]
pub struct FakeArtwork {
    images: HashMap<String, Vec<u8>>,
}

impl FakeArtwork {
    pub fn with_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl ArtworkFetcher for FakeArtwork {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        self.images.get(url).cloned().ok_or(ImageError::Status(404))
    }
}
