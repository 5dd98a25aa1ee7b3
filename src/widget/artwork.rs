//! Album art fetching and palette extraction with fallbacks.
//!
//! The artwork is fetched and decoded once per render. Both palettes come
//! from that one image, and its bytes are embedded in the widget as a data
//! URI. Every failure drops to the next level:
//!
//! 1. the track's own artwork
//! 2. a generic placeholder image (random colors, built-in graphic shown)
//! 3. the fixed default palettes

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::palette::{quantize, ColorPalette};

pub const DEFAULT_PLACEHOLDER_URL: &str = "https://picsum.photos/300/300";

pub const BAR_PALETTE_SIZE: usize = 4;
pub const SONG_PALETTE_SIZE: usize = 2;

const MAX_ARTWORK_BYTES: usize = 10 * 1024 * 1024;

/// Shown in place of album art when the track has none.
const PLACEHOLDER_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="300" viewBox="0 0 300 300"><rect width="300" height="300" fill="#2b2b2b"/><circle cx="150" cy="150" r="96" fill="#1e1e1e"/><circle cx="150" cy="150" r="28" fill="#3c3c3c"/><circle cx="150" cy="150" r="6" fill="#1e1e1e"/></svg>"##;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("Image server returned HTTP {0}")]
    Status(u16),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image has no usable pixels")]
    NoPixels,
}

/// Source of artwork bytes.
#[async_trait]
pub trait ArtworkFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError>;
}

pub struct HttpArtworkFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpArtworkFetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl ArtworkFetcher for HttpArtworkFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ImageError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageError::Fetch(e.to_string()))?;
        if bytes.len() > MAX_ARTWORK_BYTES {
            return Err(ImageError::Fetch(format!(
                "image too large ({} bytes)",
                bytes.len()
            )));
        }
        Ok(bytes.to_vec())
    }
}

/// Which fallback level produced the palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteSource {
    Artwork,
    Placeholder,
    Default,
}

impl PaletteSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaletteSource::Artwork => "artwork",
            PaletteSource::Placeholder => "placeholder",
            PaletteSource::Default => "default",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractedArtwork {
    /// `data:` URI of the image to show.
    pub image_data_uri: String,
    pub bar_palette: ColorPalette,
    pub song_palette: ColorPalette,
    pub source: PaletteSource,
}

struct Quantized {
    bytes: Vec<u8>,
    bar_palette: ColorPalette,
    song_palette: ColorPalette,
}

pub fn placeholder_data_uri() -> String {
    format!("data:image/svg+xml;base64,{}", BASE64.encode(PLACEHOLDER_SVG))
}

fn data_uri(bytes: &[u8]) -> String {
    let mime = infer::get(bytes)
        .map(|kind| kind.mime_type())
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or("image/png");
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

pub struct PaletteExtractor {
    fetcher: Arc<dyn ArtworkFetcher>,
    placeholder_url: Option<String>,
}

impl PaletteExtractor {
    /// `placeholder_url` of `None` skips the placeholder level.
    pub fn new(fetcher: Arc<dyn ArtworkFetcher>, placeholder_url: Option<String>) -> Self {
        Self {
            fetcher,
            placeholder_url,
        }
    }

    async fn fetch_and_quantize(&self, url: &str) -> Result<Quantized, ImageError> {
        let bytes = self.fetcher.fetch(url).await?;
        let image = image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(Quantized {
            bar_palette: quantize(&image, BAR_PALETTE_SIZE)?,
            song_palette: quantize(&image, SONG_PALETTE_SIZE)?,
            bytes,
        })
    }

    /// Always returns usable palettes.
    pub async fn extract(&self, artwork_url: Option<&str>) -> ExtractedArtwork {
        if let Some(url) = artwork_url.filter(|u| !u.is_empty()) {
            match self.fetch_and_quantize(url).await {
                Ok(q) => {
                    return ExtractedArtwork {
                        image_data_uri: data_uri(&q.bytes),
                        bar_palette: q.bar_palette,
                        song_palette: q.song_palette,
                        source: PaletteSource::Artwork,
                    }
                }
                Err(e) => warn!("Album art unusable, trying placeholder: {}", e),
            }
        } else {
            debug!("Track has no album art, trying placeholder");
        }

        if let Some(url) = self.placeholder_url.as_deref() {
            match self.fetch_and_quantize(url).await {
                Ok(q) => {
                    return ExtractedArtwork {
                        image_data_uri: placeholder_data_uri(),
                        bar_palette: q.bar_palette,
                        song_palette: q.song_palette,
                        source: PaletteSource::Placeholder,
                    }
                }
                Err(e) => warn!("Placeholder image unusable, using default colors: {}", e),
            }
        }

        ExtractedArtwork {
            image_data_uri: placeholder_data_uri(),
            bar_palette: ColorPalette::default_bars(),
            song_palette: ColorPalette::default_song(),
            source: PaletteSource::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::palette::Rgb;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn png_bytes(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 8, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[derive(Default)]
    struct MapFetcher {
        responses: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl MapFetcher {
        fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.responses.insert(url.to_string(), bytes);
            self
        }
    }

    #[async_trait]
    impl ArtworkFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(url)
                .cloned()
                .ok_or(ImageError::Status(404))
        }
    }

    #[tokio::test]
    async fn uses_artwork_when_available() {
        let fetcher = Arc::new(MapFetcher::default().with("http://art/cover.png", png_bytes([200, 10, 10, 255])));
        let extractor = PaletteExtractor::new(fetcher.clone(), Some("http://placeholder".to_string()));

        let result = extractor.extract(Some("http://art/cover.png")).await;

        assert_eq!(result.source, PaletteSource::Artwork);
        assert_eq!(result.bar_palette.len(), 4);
        assert_eq!(result.song_palette.len(), 2);
        assert_eq!(result.bar_palette.first(), Rgb::new(200, 10, 10));
        assert!(result.image_data_uri.starts_with("data:image/png;base64,"));
        // one fetch serves both palettes
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn broken_artwork_falls_back_to_placeholder() {
        let fetcher = Arc::new(
            MapFetcher::default()
                .with("http://art/broken", b"not an image".to_vec())
                .with("http://placeholder", png_bytes([10, 200, 10, 255])),
        );
        let extractor = PaletteExtractor::new(fetcher, Some("http://placeholder".to_string()));

        let result = extractor.extract(Some("http://art/broken")).await;

        assert_eq!(result.source, PaletteSource::Placeholder);
        assert_eq!(result.bar_palette.first(), Rgb::new(10, 200, 10));
        assert_eq!(result.image_data_uri, placeholder_data_uri());
    }

    #[tokio::test]
    async fn missing_url_goes_straight_to_placeholder() {
        let fetcher = Arc::new(MapFetcher::default().with("http://placeholder", png_bytes([1, 2, 3, 255])));
        let extractor = PaletteExtractor::new(fetcher, Some("http://placeholder".to_string()));

        let result = extractor.extract(None).await;
        assert_eq!(result.source, PaletteSource::Placeholder);
    }

    #[tokio::test]
    async fn everything_failing_yields_defaults() {
        let extractor = PaletteExtractor::new(Arc::new(MapFetcher::default()), Some("http://placeholder".to_string()));

        let result = extractor.extract(Some("http://art/missing")).await;

        assert_eq!(result.source, PaletteSource::Default);
        assert_eq!(result.bar_palette, ColorPalette::default_bars());
        assert_eq!(result.song_palette, ColorPalette::default_song());
        assert!(result.image_data_uri.starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn transparent_artwork_is_a_fallback_case() {
        let fetcher = Arc::new(MapFetcher::default().with("http://art/clear.png", png_bytes([0, 0, 0, 0])));
        let extractor = PaletteExtractor::new(fetcher, None);

        let result = extractor.extract(Some("http://art/clear.png")).await;
        assert_eq!(result.source, PaletteSource::Default);
    }
}
