use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::resolver::HistorySelection;

/// Root TOML configuration structure.
/// All fields are optional - CLI values are used as defaults.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub cache_max_age_sec: Option<u32>,
    pub http_timeout_sec: Option<u64>,
    pub render_seed: Option<u64>,

    pub history_limit: Option<usize>,
    pub history_selection: Option<HistorySelection>,

    pub spotify: Option<SpotifyFileConfig>,
    pub lastfm: Option<LastFmFileConfig>,
    pub widget: Option<WidgetFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SpotifyFileConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LastFmFileConfig {
    pub api_key: Option<String>,
    pub username: Option<String>,
}

/// Server-wide widget defaults, used when a request omits a parameter.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct WidgetFileConfig {
    pub background_color: Option<String>,
    pub border_color: Option<String>,
    pub background_type: Option<String>,
    /// Image whose colors are used when the track has no usable artwork.
    pub placeholder_url: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 8080
metrics_port = 9100
logging_level = "headers"
cache_max_age_sec = 30
history_limit = 5
history_selection = "most_recent"

[spotify]
client_id = "id"
client_secret = "secret"
refresh_token = "refresh"

[lastfm]
api_key = "key"
username = "someone"

[widget]
background_color = "000000"
background_type = "blur_dark"
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.metrics_port, Some(9100));
        assert_eq!(config.logging_level.as_deref(), Some("headers"));
        assert_eq!(config.cache_max_age_sec, Some(30));
        assert_eq!(config.history_limit, Some(5));
        assert_eq!(config.history_selection, Some(HistorySelection::MostRecent));

        let spotify = config.spotify.unwrap();
        assert_eq!(spotify.client_id.as_deref(), Some("id"));
        assert_eq!(spotify.refresh_token.as_deref(), Some("refresh"));

        let lastfm = config.lastfm.unwrap();
        assert_eq!(lastfm.username.as_deref(), Some("someone"));

        let widget = config.widget.unwrap();
        assert_eq!(widget.background_color.as_deref(), Some("000000"));
        assert_eq!(widget.border_color, None);
        assert_eq!(widget.background_type.as_deref(), Some("blur_dark"));
    }

    #[test]
    fn test_load_empty_config() {
        let file = NamedTempFile::new().unwrap();
        let config = FileConfig::load(file.path()).unwrap();
        assert!(config.port.is_none());
        assert!(config.spotify.is_none());
        assert!(config.widget.is_none());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number").unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(FileConfig::load(Path::new("/definitely/not/here.toml")).is_err());
    }
}
