//! Overflow detection for the scrolling title and artist lines.
//!
//! Real glyph metrics are unavailable when composing the document, so text
//! width is estimated from the display width of the string.

use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeConfig {
    /// Estimated glyph advance as a fraction of the font size.
    pub char_width_factor: f64,
    /// Gap between the end of the text and its repeated copy, in ems.
    pub spacer_ems: f64,
    /// Scroll speed in px per second.
    pub speed_px_per_sec: f64,
    pub min_duration_sec: f64,
}

impl Default for MarqueeConfig {
    fn default() -> Self {
        Self {
            char_width_factor: 0.9,
            spacer_ems: 6.0,
            speed_px_per_sec: 40.0,
            min_duration_sec: 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarqueeDecision {
    pub enabled: bool,
    /// Seconds per scroll cycle, present only when enabled.
    pub duration_seconds: Option<f64>,
}

impl MarqueeDecision {
    pub const STATIC: MarqueeDecision = MarqueeDecision {
        enabled: false,
        duration_seconds: None,
    };
}

impl MarqueeConfig {
    pub fn estimated_width(&self, text: &str, font_size: f64) -> f64 {
        text.width() as f64 * font_size * self.char_width_factor
    }

    pub fn spacer_width(&self, font_size: f64) -> f64 {
        font_size * self.spacer_ems
    }

    /// Distance one scroll cycle travels: the text plus its trailing gap.
    pub fn scroll_distance(&self, text: &str, font_size: f64) -> f64 {
        self.estimated_width(text, font_size) + self.spacer_width(font_size)
    }

    /// Scrolls only text wider than the container. The spacer counts toward
    /// the duration, never toward the overflow check.
    pub fn decide(&self, text: &str, font_size: f64, container_width: f64) -> MarqueeDecision {
        if text.trim().is_empty() || self.estimated_width(text, font_size) <= container_width {
            return MarqueeDecision::STATIC;
        }

        let distance = self.scroll_distance(text, font_size);
        let duration = (distance / self.speed_px_per_sec).max(self.min_duration_sec);
        MarqueeDecision {
            enabled: true,
            duration_seconds: Some((duration * 10.0).round() / 10.0),
        }
    }
}
