//! End-to-end rendering: resolve a track, extract and normalize its colors,
//! synthesize the animation and compose the SVG.
//!
//! Only track resolution can fail. Every later stage degrades to defaults.

use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::WidgetError;
use crate::providers::{AudioFeatures, TrackRecord};
use crate::resolver::TrackResolver;
use crate::server::metrics::{record_palette_source, record_render};
use crate::widget::artwork::PaletteExtractor;
use crate::widget::composer::{compose, render_error_svg, render_svg};
use crate::widget::marquee::MarqueeConfig;
use crate::widget::normalize::{normalize_palette, LightnessBand};
use crate::widget::timing::{synthesize, TimingConfig};
use crate::widget::WidgetParams;

/// Outcome of a render that never fails: either the widget or an error
/// graphic, with the status associated with it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedWidget {
    pub svg: String,
    /// 200 for the widget, the error's status code otherwise.
    pub status: u16,
    pub error: Option<WidgetError>,
}

pub struct WidgetPipeline {
    resolver: TrackResolver,
    extractor: PaletteExtractor,
    timing: TimingConfig,
    marquee: MarqueeConfig,
}

impl WidgetPipeline {
    pub fn new(resolver: TrackResolver, extractor: PaletteExtractor) -> Self {
        Self {
            resolver,
            extractor,
            timing: TimingConfig::default(),
            marquee: MarqueeConfig::default(),
        }
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn resolver(&self) -> &TrackResolver {
        &self.resolver
    }

    /// Renders a resolved track. Never fails.
    pub async fn render_track(
        &self,
        track: &TrackRecord,
        params: &WidgetParams,
        rng: &mut StdRng,
    ) -> String {
        let layout = params.layout();

        let artwork = self.extractor.extract(track.album_art_url.as_deref()).await;
        record_palette_source(artwork.source.as_str());
        debug!(source = artwork.source.as_str(), "Palettes extracted");

        let bar_palette = normalize_palette(&artwork.bar_palette, LightnessBand::BARS);
        let song_palette = normalize_palette(&artwork.song_palette, LightnessBand::TEXT);

        let features = track.audio_features.unwrap_or(AudioFeatures::ESTIMATED);
        let schedule = synthesize(
            layout.bar_count,
            features.tempo,
            features.energy,
            &bar_palette,
            &self.timing,
            rng,
        );

        let bindings = compose(
            track,
            params,
            &artwork,
            bar_palette,
            song_palette,
            schedule,
            &self.marquee,
        );
        render_svg(&bindings)
    }

    pub async fn render(&self, params: &WidgetParams, rng: &mut StdRng) -> Result<String, WidgetError> {
        let track = self.resolver.resolve(rng).await?;
        Ok(self.render_track(&track, params, rng).await)
    }

    /// Renders the widget, or an error graphic when no track can be resolved.
    pub async fn render_or_error(&self, params: &WidgetParams, rng: &mut StdRng) -> RenderedWidget {
        let started = Instant::now();
        let provider = self
            .resolver
            .active_provider()
            .map(|p| p.name().to_string())
            .unwrap_or_else(|_| "none".to_string());

        match self.render(params, rng).await {
            Ok(svg) => {
                record_render(&provider, "ok", started.elapsed());
                RenderedWidget {
                    svg,
                    status: 200,
                    error: None,
                }
            }
            Err(err) => {
                warn!(kind = err.kind(), "Rendering error graphic: {}", err);
                record_render(&provider, err.kind(), started.elapsed());
                RenderedWidget {
                    svg: render_error_svg(&err.display_message(), err.status_code(), params.layout()),
                    status: err.status_code(),
                    error: Some(err),
                }
            }
        }
    }
}
