//! Assembles the final SVG document.
//!
//! [`compose`] gathers everything the document needs into [`WidgetBindings`]
//! (escaping text, picking the status wording and layout), and
//! [`render_svg`] turns the bindings into markup. Rendering has no failure
//! mode.

use super::artwork::ExtractedArtwork;
use super::escape::escape_xml;
use super::layout::{BackgroundMode, WidgetLayout, WidgetParams};
use super::marquee::{MarqueeConfig, MarqueeDecision};
use super::palette::{ColorPalette, Rgb};
use super::timing::AnimationSchedule;
use crate::providers::TrackRecord;

pub const STATUS_PLAYING: &str = "Vibing to:";
pub const STATUS_RECENT: &str = "Recently played:";

const FONT_FAMILY: &str = "'Segoe UI', Ubuntu, 'Helvetica Neue', Sans-Serif";
/// Fraction of each marquee cycle spent paused at the start.
const MARQUEE_PAUSE_PERCENT: u32 = 15;

/// One line of (possibly scrolling) text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Escaped for markup.
    pub text: String,
    pub font_size: u32,
    pub marquee: MarqueeDecision,
    pub scroll_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetBindings {
    pub layout: WidgetLayout,
    /// `#rrggbb`
    pub background_color: String,
    pub border_color: String,
    pub background_mode: BackgroundMode,
    pub status_text: Option<&'static str>,
    pub title: TextLine,
    pub artist: TextLine,
    pub album_name: String,
    pub track_url: String,
    pub artist_url: String,
    pub image_data_uri: String,
    pub bar_palette: ColorPalette,
    pub song_palette: ColorPalette,
    pub schedule: AnimationSchedule,
}

pub fn status_text(is_playing: bool) -> &'static str {
    if is_playing {
        STATUS_PLAYING
    } else {
        STATUS_RECENT
    }
}

fn text_line(raw: &str, font_size: u32, container_width: u32, marquee: &MarqueeConfig) -> TextLine {
    let size = font_size as f64;
    TextLine {
        text: escape_xml(raw),
        font_size,
        marquee: marquee.decide(raw, size, container_width as f64),
        scroll_px: marquee.scroll_distance(raw, size),
    }
}

/// Collects everything the document needs. Palettes are expected to be
/// normalized already.
#[allow(clippy::too_many_arguments)]
pub fn compose(
    track: &TrackRecord,
    params: &WidgetParams,
    artwork: &ExtractedArtwork,
    bar_palette: ColorPalette,
    song_palette: ColorPalette,
    schedule: AnimationSchedule,
    marquee: &MarqueeConfig,
) -> WidgetBindings {
    let layout = *params.layout();

    WidgetBindings {
        layout,
        background_color: format!("#{}", params.background_color),
        border_color: format!("#{}", params.border_color),
        background_mode: params.background_mode,
        status_text: params.show_status.then(|| status_text(track.is_playing)),
        title: text_line(
            &track.track_name,
            layout.title_font_size,
            layout.text_container_width,
            marquee,
        ),
        artist: text_line(
            &track.artist_name,
            layout.artist_font_size,
            layout.text_container_width,
            marquee,
        ),
        album_name: escape_xml(&track.album_name),
        track_url: escape_xml(&track.track_url),
        artist_url: escape_xml(&track.artist_url),
        image_data_uri: artwork.image_data_uri.clone(),
        bar_palette,
        song_palette,
        schedule,
    }
}

fn fmt_num(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}

fn gradient_stops(colors: &[Rgb]) -> String {
    let last = colors.len().saturating_sub(1).max(1) as f64;
    colors
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                r#"<stop offset="{}%" stop-color="{}"/>"#,
                fmt_num(i as f64 / last * 100.0),
                c.hex()
            )
        })
        .collect()
}

fn marquee_css(name: &str, line: &TextLine) -> String {
    match line.marquee.duration_seconds.filter(|_| line.marquee.enabled) {
        Some(duration) => format!(
            "@keyframes np-scroll-{name} {{ 0%, {pause}% {{ transform: translateX(0); }} 100% {{ transform: translateX(-{px}px); }} }}\n\
             .np-scroll-{name} {{ animation: np-scroll-{name} {dur}s linear infinite; }}\n",
            name = name,
            pause = MARQUEE_PAUSE_PERCENT,
            px = fmt_num(line.scroll_px),
            dur = fmt_num(duration),
        ),
        None => String::new(),
    }
}

fn style_block(b: &WidgetBindings) -> String {
    let layout = &b.layout;
    let rest_scale = layout.bar_min_height as f64 / layout.bar_max_height.max(1) as f64;
    let mut css = String::new();
    css.push_str(&format!(
        "text {{ font-family: {}; }}\n\
         .np-status {{ font-size: {}px; fill: #9a9a9a; }}\n\
         .np-title {{ font-size: {}px; font-weight: 600; }}\n\
         .np-artist {{ font-size: {}px; }}\n\
         .np-bar {{ transform-box: fill-box; transform-origin: 50% 100%; animation-name: np-pulse; \
         animation-timing-function: ease-in-out; animation-iteration-count: infinite; animation-direction: alternate; }}\n\
         @keyframes np-pulse {{ from {{ transform: scaleY({}); }} to {{ transform: scaleY(1); }} }}\n",
        FONT_FAMILY,
        layout.status_font_size,
        b.title.font_size,
        b.artist.font_size,
        fmt_num_precise(rest_scale),
    ));
    css.push_str(&marquee_css("title", &b.title));
    css.push_str(&marquee_css("artist", &b.artist));
    css
}

fn fmt_num_precise(value: f64) -> String {
    format!("{:.3}", value)
}

fn background(b: &WidgetBindings) -> String {
    let layout = &b.layout;
    let mut out = format!(
        r#"<rect width="{}" height="{}" fill="{}"/>"#,
        layout.width, layout.height, b.background_color
    );
    let overlay = match b.background_mode {
        BackgroundMode::Color => None,
        BackgroundMode::BlurDark => Some(("#000000", layout.blur_dark_opacity)),
        BackgroundMode::BlurLight => Some(("#ffffff", layout.blur_light_opacity)),
    };
    if let Some((color, opacity)) = overlay {
        out.push_str(&format!(
            r#"<image href="{}" x="-{pad}" y="-{pad}" width="{}" height="{}" preserveAspectRatio="xMidYMid slice" filter="url(#np-blur)"/>"#,
            b.image_data_uri,
            layout.width + 2 * layout.blur_amount,
            layout.height + 2 * layout.blur_amount,
            pad = layout.blur_amount,
        ));
        out.push_str(&format!(
            r#"<rect width="{}" height="{}" fill="{}" fill-opacity="{}"/>"#,
            layout.width, layout.height, color, opacity
        ));
    }
    out
}

fn link_open(url: &str) -> String {
    if url.is_empty() {
        "<g>".to_string()
    } else {
        format!(r#"<a href="{}" target="_blank">"#, url)
    }
}

fn link_close(url: &str) -> &'static str {
    if url.is_empty() {
        "</g>"
    } else {
        "</a>"
    }
}

fn text_element(line: &TextLine, name: &str, x: u32, baseline: f64, fill: &str) -> String {
    let text = |x: f64| {
        format!(
            r#"<text class="np-{}" x="{}" y="{}" fill="{}">{}</text>"#,
            name,
            fmt_num(x),
            fmt_num(baseline),
            fill,
            line.text
        )
    };

    if line.marquee.enabled {
        format!(
            r#"<g class="np-scroll-{}">{}{}</g>"#,
            name,
            text(x as f64),
            text(x as f64 + line.scroll_px)
        )
    } else {
        text(x as f64)
    }
}

fn bars(b: &WidgetBindings, bottom: f64) -> String {
    let layout = &b.layout;
    let values = b
        .schedule
        .color_cycle
        .stops
        .iter()
        .map(Rgb::hex)
        .collect::<Vec<_>>()
        .join(";");
    let first = b.bar_palette.first().hex();
    let top = bottom - layout.bar_max_height as f64;

    let mut out = String::from(r#"<g class="np-bars">"#);
    for (i, timing) in b.schedule.bars.iter().enumerate() {
        let x = layout.text_x() + i as u32 * layout.bar_pitch;
        out.push_str(&format!(
            r#"<rect class="np-bar" x="{}" y="{}" width="{}" height="{}" rx="1" fill="{}" style="animation-duration: {}ms; animation-delay: -{}ms"><animate attributeName="fill" values="{}" dur="{}ms" begin="-{}ms" repeatCount="indefinite"/></rect>"#,
            x,
            fmt_num(top),
            layout.bar_width,
            layout.bar_max_height,
            first,
            timing.pulse_duration_ms,
            timing.pulse_delay_ms,
            values,
            b.schedule.color_cycle.duration_ms,
            timing.wave_delay_ms,
        ));
    }
    out.push_str("</g>");
    out
}

pub fn render_svg(b: &WidgetBindings) -> String {
    let layout = &b.layout;
    let (w, h) = (layout.width, layout.height);
    let art_x = layout.padding;
    let art_y = layout.album_art_y();
    let art = layout.album_art_size;
    let text_x = layout.text_x();

    let mut baseline = art_y;
    let status = b.status_text.map(|status| {
        baseline += layout.status_font_size as f64;
        format!(
            r#"<text class="np-status" x="{}" y="{}">{}</text>"#,
            text_x,
            fmt_num(baseline),
            status
        )
    });
    let title_baseline = baseline + b.title.font_size as f64 + 4.0;
    let artist_baseline = title_baseline + b.artist.font_size as f64 + 6.0;
    let bars_bottom = art_y + art as f64;

    let song_colors = b.song_palette.colors();
    let artist_fill = song_colors.get(1).unwrap_or(&song_colors[0]).hex();

    let mut svg = String::with_capacity(16 * 1024);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img" aria-label="{title} by {artist}">"#,
        w = w,
        h = h,
        title = b.title.text,
        artist = b.artist.text,
    ));
    svg.push_str(&format!(
        "<title>{} by {} ({})</title>",
        b.title.text, b.artist.text, b.album_name
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        r#"<clipPath id="np-card"><rect width="{}" height="{}" rx="{}"/></clipPath>"#,
        w, h, layout.border_radius
    ));
    svg.push_str(&format!(
        r#"<clipPath id="np-art"><rect x="{}" y="{}" width="{}" height="{}" rx="{}"/></clipPath>"#,
        art_x,
        fmt_num(art_y),
        art,
        art,
        layout.border_radius
    ));
    svg.push_str(&format!(
        r#"<clipPath id="np-text"><rect x="{}" y="0" width="{}" height="{}"/></clipPath>"#,
        text_x, layout.text_container_width, h
    ));
    svg.push_str(&format!(
        r#"<linearGradient id="np-song" x1="0" y1="0" x2="1" y2="0">{}</linearGradient>"#,
        gradient_stops(song_colors)
    ));
    if b.background_mode.is_blurred() {
        svg.push_str(&format!(
            r#"<filter id="np-blur" x="-10%" y="-10%" width="120%" height="120%"><feGaussianBlur stdDeviation="{}"/></filter>"#,
            layout.blur_amount
        ));
    }
    svg.push_str("</defs>");

    svg.push_str("<style>\n");
    svg.push_str(&style_block(b));
    svg.push_str("</style>");

    svg.push_str(r#"<g clip-path="url(#np-card)">"#);
    svg.push_str(&background(b));
    svg.push_str("</g>");
    svg.push_str(&format!(
        r#"<rect x="0.5" y="0.5" width="{}" height="{}" rx="{}" fill="none" stroke="{}"/>"#,
        w - 1,
        h - 1,
        layout.border_radius,
        b.border_color
    ));

    svg.push_str(&link_open(&b.track_url));
    svg.push_str(&format!(
        r#"<image href="{}" x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid slice" clip-path="url(#np-art)"/>"#,
        b.image_data_uri,
        art_x,
        fmt_num(art_y),
        art,
        art
    ));
    svg.push_str(link_close(&b.track_url));

    svg.push_str(r#"<g clip-path="url(#np-text)">"#);
    if let Some(status) = status {
        svg.push_str(&status);
    }
    svg.push_str(&link_open(&b.track_url));
    svg.push_str(&text_element(&b.title, "title", text_x, title_baseline, "url(#np-song)"));
    svg.push_str(link_close(&b.track_url));
    svg.push_str(&link_open(&b.artist_url));
    svg.push_str(&text_element(&b.artist, "artist", text_x, artist_baseline, &artist_fill));
    svg.push_str(link_close(&b.artist_url));
    svg.push_str("</g>");

    svg.push_str(&bars(b, bars_bottom));
    svg.push_str("</svg>");
    svg
}

/// Greedy word wrap on estimated glyph widths.
fn wrap_words(text: &str, max_chars: usize, max_lines: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push('…');
        }
    }
    lines
}

/// Error graphic shown instead of the widget when no track can be rendered.
pub fn render_error_svg(message: &str, status: u16, layout: &WidgetLayout) -> String {
    let (w, h) = (layout.width, layout.height);
    let font_size = layout.artist_font_size.saturating_sub(3).max(10);
    let usable = (w - 2 * layout.padding) as f64;
    let max_chars = (usable / (font_size as f64 * 0.6)).floor().max(10.0) as usize;
    let max_lines = if h < 100 { 2 } else { 4 };

    let heading_size = layout.title_font_size.saturating_sub(4).max(12);
    let heading_y = layout.padding + heading_size;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img" aria-label="Error {status}">"#,
        w = w,
        h = h,
        status = status
    );
    svg.push_str(&format!(
        r##"<rect x="0.5" y="0.5" width="{}" height="{}" rx="{}" fill="#181414" stroke="#e5534b"/>"##,
        w - 1,
        h - 1,
        layout.border_radius
    ));
    svg.push_str(&format!(
        r##"<text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="600" fill="#e5534b">Error {}</text>"##,
        layout.padding, heading_y, FONT_FAMILY, heading_size, status
    ));

    let line_height = font_size as f64 * 1.3;
    for (i, line) in wrap_words(message, max_chars, max_lines).iter().enumerate() {
        svg.push_str(&format!(
            r##"<text x="{}" y="{}" font-family="{}" font-size="{}" fill="#c9c9c9">{}</text>"##,
            layout.padding,
            fmt_num(heading_y as f64 + 8.0 + line_height * (i + 1) as f64),
            FONT_FAMILY,
            font_size,
            escape_xml(line)
        ));
    }
    svg.push_str("</svg>");
    svg
}
