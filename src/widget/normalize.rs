//! Lightness clamping for extracted palettes.
//!
//! Album art is often near-black or near-white, neither of which reads well
//! as a bar or text color. Each color's HLS lightness is clamped into a band
//! while hue and saturation are kept.

use super::palette::{ColorPalette, Rgb};

/// Colors this close to the band (one 8-bit step) count as inside it, so
/// rounding back to 8 bits can't push a normalized color out again.
const TOLERANCE: f64 = 1.0 / 255.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightnessBand {
    pub min: f64,
    pub max: f64,
}

impl LightnessBand {
    /// Bars sit on the background and tolerate a wider range.
    pub const BARS: LightnessBand = LightnessBand { min: 0.3, max: 0.7 };
    pub const TEXT: LightnessBand = LightnessBand {
        min: 0.35,
        max: 0.75,
    };

    fn contains(&self, lightness: f64) -> bool {
        lightness >= self.min - TOLERANCE && lightness <= self.max + TOLERANCE
    }
}

pub fn normalize_palette(palette: &ColorPalette, band: LightnessBand) -> ColorPalette {
    palette.map(|color| normalize_color(color, band))
}

pub fn normalize_color(color: Rgb, band: LightnessBand) -> Rgb {
    let (h, l, s) = rgb_to_hls(
        color.r as f64 / 255.0,
        color.g as f64 / 255.0,
        color.b as f64 / 255.0,
    );
    if band.contains(l) {
        return color;
    }

    let (r, g, b) = hls_to_rgb(h, l.clamp(band.min, band.max), s);
    Rgb::new(to_byte(r), to_byte(g), to_byte(b))
}

fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

/// RGB in [0, 1] to (hue, lightness, saturation), all in [0, 1].
pub fn rgb_to_hls(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let sum = max + min;
    let range = max - min;
    let l = sum / 2.0;

    if range == 0.0 {
        return (0.0, l, 0.0);
    }

    let s = if l <= 0.5 {
        range / sum
    } else {
        range / (2.0 - sum)
    };

    let rc = (max - r) / range;
    let gc = (max - g) / range;
    let bc = (max - b) / range;
    let h = if r == max {
        bc - gc
    } else if g == max {
        2.0 + rc - bc
    } else {
        4.0 + gc - rc
    };

    ((h / 6.0).rem_euclid(1.0), l, s)
}

pub fn hls_to_rgb(h: f64, l: f64, s: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (l, l, l);
    }
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    (
        hue_channel(m1, m2, h + 1.0 / 3.0),
        hue_channel(m1, m2, h),
        hue_channel(m1, m2, h - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}
