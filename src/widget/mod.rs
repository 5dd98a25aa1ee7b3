//! The track-to-SVG rendering stages.

pub mod artwork;
pub mod composer;
pub mod escape;
pub mod layout;
pub mod marquee;
pub mod normalize;
pub mod palette;
pub mod timing;

pub use artwork::{
    ArtworkFetcher, ExtractedArtwork, HttpArtworkFetcher, ImageError, PaletteExtractor,
    PaletteSource,
};
pub use composer::{compose, render_error_svg, render_svg, WidgetBindings};
pub use layout::{BackgroundMode, WidgetLayout, WidgetParams};
pub use marquee::{MarqueeConfig, MarqueeDecision};
pub use normalize::{normalize_palette, LightnessBand};
pub use palette::{ColorPalette, Rgb};
pub use timing::{AnimationSchedule, TimingConfig};
