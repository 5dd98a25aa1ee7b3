//! Query-string parsing for the widget route.
//!
//! Bad values never fail the request: each one is logged and replaced with
//! its default.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::WidgetError;
use crate::widget::layout::{DEFAULT_BACKGROUND_COLOR, DEFAULT_BORDER_COLOR};
use crate::widget::{BackgroundMode, WidgetParams};

lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new("^[0-9a-fA-F]{6}$").expect("Invalid hex color regex");
}

/// Server-wide fallbacks for request parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetDefaults {
    pub background_color: String,
    pub border_color: String,
    pub background_mode: BackgroundMode,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            border_color: DEFAULT_BORDER_COLOR.to_string(),
            background_mode: BackgroundMode::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WidgetQuery {
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub background_type: Option<String>,
    pub show_status: Option<String>,
    pub compact: Option<String>,
}

/// Lowercased six-digit hex color, with or without a leading `#`.
pub fn validate_hex_color(name: &str, value: &str) -> Result<String, WidgetError> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if HEX_COLOR.is_match(digits) {
        Ok(digits.to_ascii_lowercase())
    } else {
        Err(WidgetError::InvalidParameter {
            name: name.to_string(),
            details: format!("'{}' is not a 6 digit hex color", value),
        })
    }
}

pub fn parse_flag(value: Option<&str>) -> bool {
    value
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn color_or_default(name: &str, value: Option<&str>, default: &str) -> String {
    match value.map(|v| validate_hex_color(name, v)) {
        Some(Ok(color)) => color,
        Some(Err(e)) => {
            debug!("{}, using default", e);
            default.to_string()
        }
        None => default.to_string(),
    }
}

impl WidgetQuery {
    pub fn resolve(&self, defaults: &WidgetDefaults) -> WidgetParams {
        let background_mode = match self.background_type.as_deref() {
            Some(raw) => BackgroundMode::from_param(raw).unwrap_or_else(|| {
                debug!(
                    "{}, using default",
                    WidgetError::InvalidParameter {
                        name: "background_type".to_string(),
                        details: format!("unknown mode '{}'", raw),
                    }
                );
                defaults.background_mode
            }),
            None => defaults.background_mode,
        };

        WidgetParams {
            background_color: color_or_default(
                "background_color",
                self.background_color.as_deref(),
                &defaults.background_color,
            ),
            border_color: color_or_default(
                "border_color",
                self.border_color.as_deref(),
                &defaults.border_color,
            ),
            background_mode,
            show_status: parse_flag(self.show_status.as_deref()),
            compact: parse_flag(self.compact.as_deref()),
        }
    }
}
