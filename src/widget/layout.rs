use serde::Deserialize;

/// Fixed geometry of one display mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetLayout {
    pub width: u32,
    pub height: u32,
    pub padding: u32,
    pub album_art_size: u32,
    pub border_radius: u32,

    pub bar_count: usize,
    pub bar_width: u32,
    /// Distance between the left edges of neighbouring bars.
    pub bar_pitch: u32,
    pub bar_min_height: u32,
    pub bar_max_height: u32,

    pub status_font_size: u32,
    pub title_font_size: u32,
    pub artist_font_size: u32,
    /// Width available to the title and artist lines.
    pub text_container_width: u32,

    pub blur_amount: u32,
    pub blur_dark_opacity: f64,
    pub blur_light_opacity: f64,
}

impl WidgetLayout {
    pub const STANDARD: WidgetLayout = WidgetLayout {
        width: 480,
        height: 133,
        padding: 16,
        album_art_size: 100,
        border_radius: 5,
        bar_count: 80,
        bar_width: 3,
        bar_pitch: 4,
        bar_min_height: 3,
        bar_max_height: 15,
        status_font_size: 11,
        title_font_size: 22,
        artist_font_size: 16,
        text_container_width: 330,
        blur_amount: 20,
        blur_dark_opacity: 0.7,
        blur_light_opacity: 0.5,
    };

    pub const COMPACT: WidgetLayout = WidgetLayout {
        width: 350,
        height: 84,
        padding: 10,
        album_art_size: 64,
        border_radius: 5,
        bar_count: 60,
        bar_width: 3,
        bar_pitch: 4,
        bar_min_height: 2,
        bar_max_height: 10,
        status_font_size: 9,
        title_font_size: 18,
        artist_font_size: 13,
        text_container_width: 250,
        blur_amount: 14,
        blur_dark_opacity: 0.7,
        blur_light_opacity: 0.5,
    };

    pub fn for_mode(compact: bool) -> &'static WidgetLayout {
        if compact {
            &Self::COMPACT
        } else {
            &Self::STANDARD
        }
    }

    /// Left edge of the text column.
    pub fn text_x(&self) -> u32 {
        self.padding * 2 + self.album_art_size
    }

    /// Top edge of the album art, vertically centered.
    pub fn album_art_y(&self) -> f64 {
        (self.height as f64 - self.album_art_size as f64) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    /// Flat background color.
    #[default]
    Color,
    /// Blurred album art under a dark overlay.
    BlurDark,
    /// Blurred album art under a light overlay.
    BlurLight,
}

impl BackgroundMode {
    /// Parses a request value (`color`, `blur_dark`, `blur_light`), ignoring case.
    pub fn from_param(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "color" => Some(BackgroundMode::Color),
            "blur_dark" => Some(BackgroundMode::BlurDark),
            "blur_light" => Some(BackgroundMode::BlurLight),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundMode::Color => "color",
            BackgroundMode::BlurDark => "blur_dark",
            BackgroundMode::BlurLight => "blur_light",
        }
    }

    pub fn is_blurred(&self) -> bool {
        !matches!(self, BackgroundMode::Color)
    }
}

/// Already-validated request options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetParams {
    /// Six lowercase hex digits, no `#`.
    pub background_color: String,
    pub border_color: String,
    pub background_mode: BackgroundMode,
    pub show_status: bool,
    pub compact: bool,
}

pub const DEFAULT_BACKGROUND_COLOR: &str = "181414";
pub const DEFAULT_BORDER_COLOR: &str = "181414";

impl Default for WidgetParams {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            border_color: DEFAULT_BORDER_COLOR.to_string(),
            background_mode: BackgroundMode::default(),
            show_status: false,
            compact: false,
        }
    }
}

impl WidgetParams {
    pub fn layout(&self) -> &'static WidgetLayout {
        WidgetLayout::for_mode(self.compact)
    }
}
