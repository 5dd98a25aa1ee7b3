//! Error taxonomy for the widget pipeline.
//!
//! Only provider and track-resolution failures ever reach the HTTP
//! boundary. Image failures are absorbed by the artwork fallback chain and
//! invalid parameters are replaced with defaults, but both still have a
//! variant here so they can be logged with a consistent message.

use thiserror::Error;

use crate::providers::ProviderError;

/// Maximum number of characters of an error message shown in the error graphic.
const MAX_DISPLAY_MESSAGE_CHARS: usize = 120;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WidgetError {
    #[error("{0}")]
    Configuration(String),

    #[error("Authentication failed with {service}{}", details_suffix(.details, ": "))]
    Authentication { service: String, details: String },

    /// `status` is 0 when no HTTP status was received.
    #[error("{service} API error{}{}", status_suffix(*.status), details_suffix(.details, ": "))]
    Provider {
        service: String,
        status: u16,
        details: String,
    },

    #[error("No tracks available from {service}")]
    NoTracksAvailable { service: String },

    #[error("Failed to process album art{}", details_suffix(.0, ": "))]
    ImageProcessing(String),

    #[error("Invalid parameter: {name}{}", details_suffix(.details, " - "))]
    InvalidParameter { name: String, details: String },
}

fn details_suffix(details: &str, separator: &str) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!("{}{}", separator, details)
    }
}

fn status_suffix(status: u16) -> String {
    if status == 0 {
        String::new()
    } else {
        format!(" (HTTP {})", status)
    }
}

impl WidgetError {
    pub fn service_not_configured() -> Self {
        WidgetError::Configuration(
            "No music service configured. Set SPOTIFY_* or LAST_FM_* environment variables."
                .to_string(),
        )
    }

    /// The numeric status associated with this error.
    pub fn status_code(&self) -> u16 {
        match self {
            WidgetError::Configuration(_) => 500,
            WidgetError::Authentication { .. } => 401,
            WidgetError::Provider { .. } => 502,
            WidgetError::NoTracksAvailable { .. } => 204,
            WidgetError::ImageProcessing(_) => 500,
            WidgetError::InvalidParameter { .. } => 400,
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WidgetError::Configuration(_) => "configuration",
            WidgetError::Authentication { .. } => "authentication",
            WidgetError::Provider { .. } => "provider",
            WidgetError::NoTracksAvailable { .. } => "no_tracks",
            WidgetError::ImageProcessing(_) => "image_processing",
            WidgetError::InvalidParameter { .. } => "invalid_parameter",
        }
    }

    /// The message to embed in an error graphic: single line, bounded length.
    pub fn display_message(&self) -> String {
        sanitize_message(&self.to_string())
    }
}

/// Collapses whitespace and truncates a message so upstream response bodies
/// can't blow up the error graphic.
pub fn sanitize_message(message: &str) -> String {
    let collapsed = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_DISPLAY_MESSAGE_CHARS {
        return collapsed;
    }
    let mut truncated: String = collapsed
        .chars()
        .take(MAX_DISPLAY_MESSAGE_CHARS - 1)
        .collect();
    truncated.push('…');
    truncated
}

impl From<ProviderError> for WidgetError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured { .. } => WidgetError::service_not_configured(),
            ProviderError::Authentication { service, details } => {
                WidgetError::Authentication { service, details }
            }
            ProviderError::Api {
                service,
                status,
                message,
            } => WidgetError::Provider {
                service,
                status,
                details: message,
            },
            ProviderError::InvalidResponse { service, details } => WidgetError::Provider {
                service,
                status: 0,
                details: format!("unreadable response, {}", details),
            },
            ProviderError::NoTracks { service } => WidgetError::NoTracksAvailable { service },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(WidgetError::service_not_configured().status_code(), 500);
        let auth = WidgetError::Authentication {
            service: "Spotify".to_string(),
            details: String::new(),
        };
        assert_eq!(auth.status_code(), 401);
        let provider = WidgetError::Provider {
            service: "Last.fm".to_string(),
            status: 503,
            details: "down".to_string(),
        };
        assert_eq!(provider.status_code(), 502);
        let empty = WidgetError::NoTracksAvailable {
            service: "Spotify".to_string(),
        };
        assert_eq!(empty.status_code(), 204);
        let param = WidgetError::InvalidParameter {
            name: "background_color".to_string(),
            details: String::new(),
        };
        assert_eq!(param.status_code(), 400);
    }

    #[test]
    fn not_configured_message_mentions_configuration() {
        let err = WidgetError::service_not_configured();
        assert!(err.to_string().contains("configured"));
    }

    #[test]
    fn messages_include_details_only_when_present() {
        let err = WidgetError::Authentication {
            service: "Spotify".to_string(),
            details: String::new(),
        };
        assert_eq!(err.to_string(), "Authentication failed with Spotify");

        let err = WidgetError::Provider {
            service: "Spotify".to_string(),
            status: 429,
            details: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "Spotify API error (HTTP 429): slow down");

        let err = WidgetError::InvalidParameter {
            name: "border_color".to_string(),
            details: "not hex".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid parameter: border_color - not hex");
    }

    #[test]
    fn provider_errors_convert() {
        let err: WidgetError = ProviderError::NoTracks {
            service: "Last.fm".to_string(),
        }
        .into();
        assert_eq!(
            err,
            WidgetError::NoTracksAvailable {
                service: "Last.fm".to_string()
            }
        );

        let err: WidgetError = ProviderError::NotConfigured {
            service: "Spotify".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn missing_http_status_is_left_out_of_message() {
        let err: WidgetError = ProviderError::InvalidResponse {
            service: "Spotify".to_string(),
            details: "expected value".to_string(),
        }
        .into();
        assert_eq!(err.status_code(), 502);
        assert_eq!(
            err.to_string(),
            "Spotify API error: unreadable response, expected value"
        );

        let transport: WidgetError = ProviderError::Api {
            service: "Last.fm".to_string(),
            status: 0,
            message: "connection refused".to_string(),
        }
        .into();
        assert_eq!(transport.to_string(), "Last.fm API error: connection refused");
        assert!(!transport.display_message().contains("HTTP 0"));
    }

    #[test]
    fn sanitize_collapses_and_truncates() {
        assert_eq!(sanitize_message("a\n  b\tc"), "a b c");

        let long = "x".repeat(500);
        let sanitized = sanitize_message(&long);
        assert_eq!(sanitized.chars().count(), MAX_DISPLAY_MESSAGE_CHARS);
        assert!(sanitized.ends_with('…'));
    }
}
