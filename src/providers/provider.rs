//! Track provider trait definition.

use async_trait::async_trait;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::debug;

use super::models::TrackRecord;
use crate::resolver::{select_from_history, HistoryPolicy};

/// Errors a listening-history provider can report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("{service} is not configured")]
    NotConfigured { service: String },

    #[error("Authentication failed with {service}: {details}")]
    Authentication { service: String, details: String },

    /// `status` is 0 for transport failures.
    #[error("{service} API error{}: {message}", http_status(*.status))]
    Api {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response from {service}: {details}")]
    InvalidResponse { service: String, details: String },

    #[error("No tracks available from {service}")]
    NoTracks { service: String },
}

fn http_status(status: u16) -> String {
    match status {
        0 => String::new(),
        status => format!(" (HTTP {})", status),
    }
}

/// Trait for listening-history providers.
///
/// Implementations connect to a specific service (Spotify, Last.fm, ...)
/// and normalize its data into [`TrackRecord`]s. Selection between providers
/// only ever goes through this interface.
#[async_trait]
pub trait TrackProvider: Send + Sync {
    /// Human readable service name (e.g. "Spotify").
    fn name(&self) -> &str;

    /// Whether all the credentials this provider needs are present.
    fn is_configured(&self) -> bool;

    /// The track currently playing, or `None` if nothing is playing.
    async fn currently_playing(&self) -> Result<Option<TrackRecord>, ProviderError>;

    /// Recently played tracks, most recent first.
    async fn recent_tracks(&self, limit: usize) -> Result<Vec<TrackRecord>, ProviderError>;

    /// Fill in data that is only worth fetching for the track actually
    /// rendered (audio features, artwork fallbacks, better links).
    ///
    /// Enrichment is best-effort and never fails.
    async fn enrich(&self, track: TrackRecord) -> TrackRecord {
        track
    }

    /// Currently playing track, falling back to the listening history.
    async fn get_now_playing(
        &self,
        history: &HistoryPolicy,
        rng: &mut StdRng,
    ) -> Result<TrackRecord, ProviderError> {
        let track = match self.currently_playing().await? {
            Some(track) => track,
            None => {
                debug!(provider = %self.name(), "Nothing playing, falling back to history");
                let recent = self.recent_tracks(history.limit).await?;
                select_from_history(recent, history.selection, rng).ok_or_else(|| {
                    ProviderError::NoTracks {
                        service: self.name().to_string(),
                    }
                })?
            }
        };
        Ok(self.enrich(track).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_mentions_status_only_when_received() {
        let rejected = ProviderError::Api {
            service: "Last.fm".to_string(),
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(rejected.to_string(), "Last.fm API error (HTTP 503): unavailable");

        let unreachable = ProviderError::Api {
            service: "Last.fm".to_string(),
            status: 0,
            message: "connection refused".to_string(),
        };
        assert_eq!(unreachable.to_string(), "Last.fm API error: connection refused");
    }
}
