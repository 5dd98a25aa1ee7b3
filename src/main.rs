use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use now_playing_widget::config::{self, AppConfig, EnvCredentials};
use now_playing_widget::pipeline::WidgetPipeline;
use now_playing_widget::providers::{LastFmProvider, SpotifyProvider, TrackProvider};
use now_playing_widget::resolver::{HistorySelection, TrackResolver};
use now_playing_widget::server::{metrics, run_server, RequestsLoggingLevel};
use now_playing_widget::widget::{HttpArtworkFetcher, PaletteExtractor};

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping). Disabled when absent.
    #[clap(long)]
    pub metrics_port: Option<u16>,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// `s-maxage` of rendered widgets, in seconds.
    #[clap(long, default_value_t = 1)]
    pub cache_max_age_sec: u32,

    /// How many recent tracks to consider when nothing is playing.
    #[clap(long, default_value_t = 10)]
    pub history_limit: usize,

    /// How to pick a track from the recent history.
    #[clap(long, default_value = "random")]
    pub history_selection: HistorySelection,

    /// Timeout for provider and artwork requests.
    #[clap(long, default_value_t = config::DEFAULT_HTTP_TIMEOUT_SEC)]
    pub http_timeout_sec: u64,

    /// Seed every render with this value, making output reproducible.
    #[clap(long)]
    pub render_seed: Option<u64>,
}

impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            cache_max_age_sec: args.cache_max_age_sec,
            history_limit: args.history_limit,
            history_selection: args.history_selection,
            http_timeout_sec: args.http_timeout_sec,
            render_seed: args.render_seed,
        }
    }
}

/// Providers in priority order: Spotify first, Last.fm second.
fn make_providers(
    app_config: &AppConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn TrackProvider>> {
    let spotify = Arc::new(SpotifyProvider::new(
        client.clone(),
        app_config.spotify.clone(),
    ));
    let lastfm = LastFmProvider::new(client.clone(), app_config.lastfm.clone())
        .with_spotify(spotify.clone());

    let spotify: Arc<dyn TrackProvider> = spotify;
    vec![spotify, Arc::new(lastfm)]
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    // Credentials may live in a local .env
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI, TOML credentials override env)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = AppConfig::resolve(&cli_config, file_config, EnvCredentials::from_env())?;

    info!("Configuration loaded:");
    info!("  port: {}", app_config.port);
    info!("  logging_level: {}", app_config.logging_level);
    info!(
        "  history: {} tracks, {:?}",
        app_config.history.limit, app_config.history.selection
    );
    info!("  spotify configured: {}", app_config.spotify.is_some());
    info!("  lastfm configured: {}", app_config.lastfm.is_some());
    debug!("  widget defaults: {:?}", app_config.widget_defaults);

    info!("Initializing metrics...");
    metrics::init_metrics();

    let client = reqwest::Client::builder()
        .timeout(app_config.http_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let resolver = TrackResolver::new(make_providers(&app_config, &client), app_config.history);
    match resolver.active_provider() {
        Ok(provider) => info!("Using {} for track data", provider.name()),
        Err(e) => tracing::warn!("{}, every request will render an error graphic", e),
    }

    let extractor = PaletteExtractor::new(
        Arc::new(HttpArtworkFetcher::new(client, app_config.http_timeout)),
        Some(app_config.placeholder_url.clone()),
    );
    let pipeline = Arc::new(WidgetPipeline::new(resolver, extractor));

    run_server(
        app_config.server_config(),
        pipeline,
        app_config.widget_defaults.clone(),
    )
    .await
}
