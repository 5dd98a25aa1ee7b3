//! Listening-history providers.
//!
//! Each provider talks to one service and normalizes what it returns into
//! [`TrackRecord`]s, so the rest of the pipeline never sees service-specific
//! shapes.

pub mod deezer;
pub mod lastfm;
mod models;
mod provider;
pub mod spotify;
mod token_cache;

pub use deezer::DeezerClient;
pub use lastfm::{LastFmCredentials, LastFmProvider};
pub use models::{AudioFeatures, TrackRecord, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TRACK};
pub use provider::{ProviderError, TrackProvider};
pub use spotify::{SpotifyCredentials, SpotifyProvider};
pub use token_cache::{AccessToken, TokenCache, TokenSource};
