mod file_config;

pub use file_config::{FileConfig, LastFmFileConfig, SpotifyFileConfig, WidgetFileConfig};

use crate::providers::{LastFmCredentials, SpotifyCredentials};
use crate::resolver::{HistoryPolicy, HistorySelection};
use crate::server::params::{validate_hex_color, WidgetDefaults};
use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::widget::artwork::DEFAULT_PLACEHOLDER_URL;
use crate::widget::BackgroundMode;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;
use tracing::warn;

/// Timeout for provider and artwork requests unless configured otherwise.
pub const DEFAULT_HTTP_TIMEOUT_SEC: u64 = 8;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub logging_level: RequestsLoggingLevel,
    pub cache_max_age_sec: u32,
    pub history_limit: usize,
    pub history_selection: HistorySelection,
    pub http_timeout_sec: u64,
    pub render_seed: Option<u64>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let server = ServerConfig::default();
        let history = HistoryPolicy::default();
        Self {
            port: server.port,
            metrics_port: server.metrics_port,
            logging_level: server.requests_logging_level,
            cache_max_age_sec: server.cache_max_age_sec,
            history_limit: history.limit,
            history_selection: history.selection,
            http_timeout_sec: DEFAULT_HTTP_TIMEOUT_SEC,
            render_seed: None,
        }
    }
}

/// Provider credentials read from the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub lastfm_username: Option<String>,
}

impl EnvCredentials {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            spotify_client_id: var("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: var("SPOTIFY_SECRET_ID"),
            spotify_refresh_token: var("SPOTIFY_REFRESH_TOKEN"),
            lastfm_api_key: var("LAST_FM_API_KEY"),
            lastfm_username: var("LAST_FM_USERNAME"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: Option<u16>,
    pub logging_level: RequestsLoggingLevel,
    pub cache_max_age_sec: u32,
    pub http_timeout: Duration,
    pub render_seed: Option<u64>,
    pub history: HistoryPolicy,

    pub spotify: Option<SpotifyCredentials>,
    pub lastfm: Option<LastFmCredentials>,

    pub widget_defaults: WidgetDefaults,
    pub placeholder_url: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, an optional TOML file and the
    /// environment. TOML values override CLI values, and credentials in the
    /// file override the environment.
    pub fn resolve(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        env: EnvCredentials,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        if port == 0 {
            bail!("port must be greater than 0");
        }
        let metrics_port = file.metrics_port.or(cli.metrics_port);
        if metrics_port == Some(0) {
            bail!("metrics_port must be greater than 0");
        }

        let logging_level = match file.logging_level {
            Some(raw) => match parse_logging_level(&raw) {
                Some(level) => level,
                None => bail!("Unknown logging_level: {}", raw),
            },
            None => cli.logging_level.clone(),
        };

        let cache_max_age_sec = file.cache_max_age_sec.unwrap_or(cli.cache_max_age_sec);

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        if http_timeout_sec == 0 {
            bail!("http_timeout_sec must be greater than 0");
        }

        let history = HistoryPolicy {
            limit: file.history_limit.unwrap_or(cli.history_limit),
            selection: file.history_selection.unwrap_or(cli.history_selection),
        };
        if history.limit == 0 {
            bail!("history_limit must be greater than 0");
        }

        let render_seed = file.render_seed.or(cli.render_seed);

        let spotify = resolve_spotify(file.spotify.unwrap_or_default(), &env);
        let lastfm = resolve_lastfm(file.lastfm.unwrap_or_default(), &env);

        let widget_file = file.widget.unwrap_or_default();
        let fallback = WidgetDefaults::default();
        let widget_defaults = WidgetDefaults {
            background_color: match widget_file.background_color {
                Some(raw) => validate_hex_color("background_color", &raw)?,
                None => fallback.background_color,
            },
            border_color: match widget_file.border_color {
                Some(raw) => validate_hex_color("border_color", &raw)?,
                None => fallback.border_color,
            },
            background_mode: match widget_file.background_type {
                Some(raw) => match BackgroundMode::from_param(&raw) {
                    Some(mode) => mode,
                    None => bail!("Unknown background_type: {}", raw),
                },
                None => fallback.background_mode,
            },
        };
        let placeholder_url = widget_file
            .placeholder_url
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER_URL.to_string());

        Ok(AppConfig {
            port,
            metrics_port,
            logging_level,
            cache_max_age_sec,
            http_timeout: Duration::from_secs(http_timeout_sec),
            render_seed,
            history,
            spotify,
            lastfm,
            widget_defaults,
            placeholder_url,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            cache_max_age_sec: self.cache_max_age_sec,
            render_seed: self.render_seed,
        }
    }
}

fn resolve_spotify(file: SpotifyFileConfig, env: &EnvCredentials) -> Option<SpotifyCredentials> {
    let client_id = file.client_id.or_else(|| env.spotify_client_id.clone());
    let client_secret = file
        .client_secret
        .or_else(|| env.spotify_client_secret.clone());
    let refresh_token = file
        .refresh_token
        .or_else(|| env.spotify_refresh_token.clone());

    let any_set = client_id.is_some() || client_secret.is_some() || refresh_token.is_some();
    let credentials = SpotifyCredentials::new(
        client_id.as_deref().unwrap_or_default(),
        client_secret.as_deref().unwrap_or_default(),
        refresh_token.as_deref().unwrap_or_default(),
    );
    if any_set && credentials.is_none() {
        warn!("Spotify credentials are incomplete, Spotify is disabled");
    }
    credentials
}

fn resolve_lastfm(file: LastFmFileConfig, env: &EnvCredentials) -> Option<LastFmCredentials> {
    let api_key = file.api_key.or_else(|| env.lastfm_api_key.clone());
    let username = file.username.or_else(|| env.lastfm_username.clone());

    let any_set = api_key.is_some() || username.is_some();
    let credentials = LastFmCredentials::new(
        api_key.as_deref().unwrap_or_default(),
        username.as_deref().unwrap_or_default(),
    );
    if any_set && credentials.is_none() {
        warn!("Last.fm credentials are incomplete, Last.fm is disabled");
    }
    credentials
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
