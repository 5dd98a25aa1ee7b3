use serde::Serialize;

/// Audio analysis values used to drive the bar animation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AudioFeatures {
    /// Beats per minute.
    pub tempo: f64,
    /// Intensity and activity, 0.0 to 1.0.
    pub energy: f64,
    pub danceability: f64,
    /// Musical positivity, 0.0 to 1.0.
    pub valence: f64,
    /// Overall loudness in dB.
    pub loudness: f64,
}

impl AudioFeatures {
    /// Estimated averages, used when no provider can supply real features.
    pub const ESTIMATED: AudioFeatures = AudioFeatures {
        tempo: 120.0,
        energy: 0.6,
        danceability: 0.5,
        valence: 0.5,
        loudness: -8.0,
    };
}

/// A normalized track, as handed from a provider to the rendering pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRecord {
    pub is_playing: bool,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    pub album_art_url: Option<String>,
    pub track_url: String,
    pub artist_url: String,
    /// Provider-specific track id, when the provider has one.
    pub track_id: Option<String>,
    pub audio_features: Option<AudioFeatures>,
}

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

impl TrackRecord {
    /// Identity used to deduplicate listening history.
    pub fn fingerprint(&self) -> (String, String) {
        (
            self.track_name.trim().to_lowercase(),
            self.artist_name.trim().to_lowercase(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(name: &str, artist: &str) -> TrackRecord {
        TrackRecord {
            is_playing: false,
            track_name: name.to_string(),
            artist_name: artist.to_string(),
            album_name: UNKNOWN_ALBUM.to_string(),
            album_art_url: None,
            track_url: String::new(),
            artist_url: String::new(),
            track_id: None,
            audio_features: None,
        }
    }

    #[test]
    fn fingerprint_ignores_case_and_padding() {
        assert_eq!(
            track("Song ", "Band").fingerprint(),
            track("song", " BAND").fingerprint()
        );
        assert_ne!(
            track("Song", "Band").fingerprint(),
            track("Song", "Other Band").fingerprint()
        );
    }
}
