//! Chooses which provider to ask and which track to render.

use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::WidgetError;
use crate::providers::{TrackProvider, TrackRecord};

/// How a track is picked from the history when nothing is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HistorySelection {
    /// Always the most recently played track.
    MostRecent,
    /// A uniformly random track among the distinct recent ones.
    #[default]
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    /// How many recent tracks to ask the provider for.
    pub limit: usize,
    pub selection: HistorySelection,
}

impl Default for HistoryPolicy {
    fn default() -> Self {
        Self {
            limit: 10,
            selection: HistorySelection::default(),
        }
    }
}

/// Drops repeated plays of the same track, keeping the first (most recent).
pub fn dedupe_history(tracks: Vec<TrackRecord>) -> Vec<TrackRecord> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.fingerprint()))
        .collect()
}

/// Picks one track out of the history, or `None` if it is empty.
pub fn select_from_history(
    tracks: Vec<TrackRecord>,
    selection: HistorySelection,
    rng: &mut StdRng,
) -> Option<TrackRecord> {
    let mut distinct = dedupe_history(tracks);
    if distinct.is_empty() {
        return None;
    }
    let index = match selection {
        HistorySelection::MostRecent => 0,
        HistorySelection::Random => rng.random_range(0..distinct.len()),
    };
    Some(distinct.swap_remove(index))
}

/// Providers in priority order. The first configured one is used.
pub struct TrackResolver {
    providers: Vec<Arc<dyn TrackProvider>>,
    policy: HistoryPolicy,
}

impl TrackResolver {
    pub fn new(providers: Vec<Arc<dyn TrackProvider>>, policy: HistoryPolicy) -> Self {
        Self { providers, policy }
    }

    pub fn policy(&self) -> &HistoryPolicy {
        &self.policy
    }

    pub fn active_provider(&self) -> Result<&Arc<dyn TrackProvider>, WidgetError> {
        self.providers
            .iter()
            .find(|p| p.is_configured())
            .ok_or_else(WidgetError::service_not_configured)
    }

    /// Resolves the track to render. Provider failures are not retried.
    pub async fn resolve(&self, rng: &mut StdRng) -> Result<TrackRecord, WidgetError> {
        let provider = self.active_provider()?;
        debug!(provider = %provider.name(), "Resolving track");

        let track = provider.get_now_playing(&self.policy, rng).await?;
        info!(
            provider = %provider.name(),
            playing = track.is_playing,
            "Resolved \"{}\" by {}",
            track.track_name,
            track.artist_name
        );
        Ok(track)
    }
}
