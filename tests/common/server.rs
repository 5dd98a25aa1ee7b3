use now_playing_widget::pipeline::WidgetPipeline;
use now_playing_widget::providers::TrackProvider;
use now_playing_widget::resolver::{HistoryPolicy, HistorySelection, TrackResolver};
use now_playing_widget::server::{make_app, ServerConfig, WidgetDefaults};
use now_playing_widget::widget::{ArtworkFetcher, PaletteExtractor};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const PLACEHOLDER_URL: &str = "http://placeholder.test/image.png";

/// A widget server bound to a random local port, aborted on drop.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn(
        providers: Vec<Arc<dyn TrackProvider>>,
        artwork: Arc<dyn ArtworkFetcher>,
    ) -> Self {
        Self::spawn_with(providers, artwork, WidgetDefaults::default()).await
    }

    pub async fn spawn_with(
        providers: Vec<Arc<dyn TrackProvider>>,
        artwork: Arc<dyn ArtworkFetcher>,
        defaults: WidgetDefaults,
    ) -> Self {
        let policy = HistoryPolicy {
            limit: 10,
            selection: HistorySelection::MostRecent,
        };
        let pipeline = WidgetPipeline::new(
            TrackResolver::new(providers, policy),
            PaletteExtractor::new(artwork, Some(PLACEHOLDER_URL.to_string())),
        );
        let config = ServerConfig {
            render_seed: Some(42),
            ..ServerConfig::default()
        };
        let app = make_app(config, Arc::new(pipeline), defaults);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server crashed");
        });

        TestServer {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            handle,
        }
    }

    pub async fn get(&self, path_and_query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path_and_query))
            .send()
            .await
            .expect("Request to test server failed")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
