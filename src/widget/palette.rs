//! Dominant-color extraction.
//!
//! Colors are picked with median cut: the pixel set is repeatedly split
//! along its widest channel until there are enough boxes, and each box
//! contributes its average color.

use image::DynamicImage;
use std::fmt;

use super::artwork::ImageError;

/// Images are shrunk to at most this edge length before quantizing.
const SAMPLE_EDGE_PX: u32 = 128;
/// Pixels more transparent than this are ignored.
const MIN_ALPHA: u8 = 125;
/// Pixels with every channel above this are treated as background white.
const NEAR_WHITE: u8 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS functional notation, e.g. `rgb(12, 34, 56)`.
    pub fn css(&self) -> String {
        format!("rgb({}, {}, {})", self.r, self.g, self.b)
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn channel(&self, index: usize) -> u8 {
        match index {
            0 => self.r,
            1 => self.g,
            _ => self.b,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css())
    }
}

pub const DEFAULT_BAR_COLORS: [Rgb; 4] = [
    Rgb::new(75, 75, 75),
    Rgb::new(100, 100, 100),
    Rgb::new(125, 125, 125),
    Rgb::new(150, 150, 150),
];

pub const DEFAULT_SONG_COLORS: [Rgb; 2] = [Rgb::new(200, 200, 200), Rgb::new(150, 150, 150)];

/// An ordered, never empty list of colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette(Vec<Rgb>);

impl ColorPalette {
    /// Returns `None` for an empty list.
    pub fn new(colors: Vec<Rgb>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self(colors))
        }
    }

    pub fn default_bars() -> Self {
        Self(DEFAULT_BAR_COLORS.to_vec())
    }

    pub fn default_song() -> Self {
        Self(DEFAULT_SONG_COLORS.to_vec())
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> Rgb {
        self.0[0]
    }

    /// Applies `f` to every color, keeping order.
    pub fn map(&self, f: impl Fn(Rgb) -> Rgb) -> Self {
        Self(self.0.iter().copied().map(f).collect())
    }
}

fn sample_pixels(image: &DynamicImage) -> Vec<Rgb> {
    let rgba = if image.width() > SAMPLE_EDGE_PX || image.height() > SAMPLE_EDGE_PX {
        image.thumbnail(SAMPLE_EDGE_PX, SAMPLE_EDGE_PX).to_rgba8()
    } else {
        image.to_rgba8()
    };

    let opaque: Vec<Rgb> = rgba
        .pixels()
        .filter(|p| p.0[3] >= MIN_ALPHA)
        .map(|p| Rgb::new(p.0[0], p.0[1], p.0[2]))
        .collect();

    let colored: Vec<Rgb> = opaque
        .iter()
        .copied()
        .filter(|c| !(c.r > NEAR_WHITE && c.g > NEAR_WHITE && c.b > NEAR_WHITE))
        .collect();

    // An all-white image still has a palette: white.
    if colored.is_empty() {
        opaque
    } else {
        colored
    }
}

/// (channel index, range) of the channel with the widest spread.
fn widest_channel(pixels: &[Rgb]) -> (usize, u8) {
    (0..3)
        .map(|channel| {
            let (min, max) = pixels.iter().fold((u8::MAX, u8::MIN), |(lo, hi), p| {
                let v = p.channel(channel);
                (lo.min(v), hi.max(v))
            });
            (channel, max.saturating_sub(min))
        })
        .fold((0, 0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
}

fn average(pixels: &[Rgb]) -> Rgb {
    let n = pixels.len() as u64;
    let (r, g, b) = pixels.iter().fold((0u64, 0u64, 0u64), |(r, g, b), p| {
        (r + p.r as u64, g + p.g as u64, b + p.b as u64)
    });
    let avg = |sum: u64| ((sum + n / 2) / n) as u8;
    Rgb::new(avg(r), avg(g), avg(b))
}

fn median_cut(pixels: Vec<Rgb>, count: usize) -> Vec<(Rgb, usize)> {
    let mut boxes = vec![pixels];

    while boxes.len() < count {
        // Split the box with the widest spread that can still be split.
        let candidate = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.len() >= 2)
            .map(|(i, b)| (i, widest_channel(b)))
            .filter(|(_, (_, range))| *range > 0)
            .max_by_key(|(i, (_, range))| (*range, boxes[*i].len()));

        let Some((index, (channel, _))) = candidate else {
            break;
        };

        let mut target = boxes.swap_remove(index);
        target.sort_unstable_by_key(|p| p.channel(channel));
        let upper = target.split_off(target.len() / 2);
        boxes.push(target);
        boxes.push(upper);
    }

    let mut colors: Vec<(Rgb, usize)> = boxes.iter().map(|b| (average(b), b.len())).collect();
    colors.sort_by(|a, b| b.1.cmp(&a.1));
    colors
}

/// Extracts exactly `count` dominant colors (at least one), most dominant first.
///
/// Images with fewer distinct colors than requested repeat their colors
/// cyclically so callers always get the length they asked for.
pub fn quantize(image: &DynamicImage, count: usize) -> Result<ColorPalette, ImageError> {
    let count = count.max(1);
    let pixels = sample_pixels(image);
    if pixels.is_empty() {
        return Err(ImageError::NoPixels);
    }

    let dominant: Vec<Rgb> = median_cut(pixels, count)
        .into_iter()
        .map(|(color, _)| color)
        .collect();

    let colors = dominant.iter().copied().cycle().take(count).collect();
    ColorPalette::new(colors).ok_or(ImageError::NoPixels)
}
