//! End-to-end tests for the widget server.
//!
//! Each test spawns the real router on a local port with fake providers and
//! artwork, then talks to it over HTTP.

mod common;

use common::{solid_png, FakeArtwork, FakeProvider, TestServer};
use now_playing_widget::providers::{ProviderError, TrackProvider};
use now_playing_widget::server::WidgetDefaults;
use std::sync::Arc;

const ART_URL: &str = "http://art.test/cover.png";

fn red_artwork() -> Arc<FakeArtwork> {
    Arc::new(FakeArtwork::default().with_image(ART_URL, solid_png(200, 30, 30)))
}

fn playing(title: &str, artist: &str) -> Vec<Arc<dyn TrackProvider>> {
    vec![Arc::new(FakeProvider::playing(FakeProvider::track(
        title,
        artist,
        Some(ART_URL),
    )))]
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

// ============================================================================
// Routes
// ============================================================================

#[tokio::test]
async fn test_health_returns_ok() {
    let server = TestServer::spawn(Vec::new(), Arc::new(FakeArtwork::default())).await;

    let response = server.get("/health").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_widget_served_from_any_path() {
    let server = TestServer::spawn(playing("Windowlicker", "Aphex Twin"), red_artwork()).await;

    for path in ["/", "/api", "/some/deep/path?compact=false"] {
        let response = server.get(path).await;
        assert_eq!(response.status(), 200, "path {}", path);
        let body = response.text().await.unwrap();
        assert!(body.contains("Windowlicker"), "path {}", path);
    }
}

// ============================================================================
// Widget rendering
// ============================================================================

#[tokio::test]
async fn test_widget_is_cached_svg() {
    let server = TestServer::spawn(playing("Windowlicker", "Aphex Twin"), red_artwork()).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "image/svg+xml");
    assert_eq!(response.headers()["cache-control"], "s-maxage=1");

    let body = response.text().await.unwrap();
    assert!(body.starts_with("<svg"));
    assert!(body.ends_with("</svg>"));
    assert!(body.contains(r#"width="480""#));
    assert_eq!(count(&body, r#"class="np-bar""#), 80);
    assert!(body.contains("Aphex Twin"));
    // album art colors drive the bars, and the art itself is embedded
    assert!(body.contains("#c81e1e"));
    assert!(body.contains("data:image/png;base64,"));
}

#[tokio::test]
async fn test_compact_mode_uses_smaller_card() {
    let server = TestServer::spawn(playing("Windowlicker", "Aphex Twin"), red_artwork()).await;

    let body = server.get("/?compact=yes").await.text().await.unwrap();
    assert!(body.contains(r#"width="350""#));
    assert!(body.contains(r#"height="84""#));
    assert_eq!(count(&body, r#"class="np-bar""#), 60);
}

#[tokio::test]
async fn test_query_parameters_are_applied() {
    let server = TestServer::spawn(playing("Windowlicker", "Aphex Twin"), red_artwork()).await;

    let body = server
        .get("/?background_color=0A0B0C&border_color=%23ffffff&show_status=true")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("#0a0b0c"));
    assert!(body.contains("#ffffff"));
    assert!(body.contains("Vibing to:"));
}

#[tokio::test]
async fn test_invalid_color_falls_back_to_default() {
    let defaults = WidgetDefaults {
        background_color: "123456".to_string(),
        ..WidgetDefaults::default()
    };
    let server = TestServer::spawn_with(
        playing("Windowlicker", "Aphex Twin"),
        red_artwork(),
        defaults,
    )
    .await;

    let response = server.get("/?background_color=notacolor").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("#123456"));
    assert!(!body.contains("notacolor"));
}

#[tokio::test]
async fn test_titles_are_escaped() {
    let server = TestServer::spawn(playing("Rock & Roll <Live>", "AC/DC"), red_artwork()).await;

    let body = server.get("/").await.text().await.unwrap();
    assert!(body.contains("Rock &amp; Roll &lt;Live&gt;"));
    assert!(!body.contains("<Live>"));
}

#[tokio::test]
async fn test_recent_track_shown_when_nothing_plays() {
    let history = vec![
        FakeProvider::track("Latest", "Someone", Some(ART_URL)),
        FakeProvider::track("Older", "Someone", Some(ART_URL)),
    ];
    let server = TestServer::spawn(
        vec![Arc::new(FakeProvider::history(history))],
        red_artwork(),
    )
    .await;

    let body = server.get("/?show_status=1").await.text().await.unwrap();
    assert!(body.contains("Latest"));
    assert!(body.contains("Recently played:"));
}

#[tokio::test]
async fn test_missing_artwork_still_renders() {
    let providers: Vec<Arc<dyn TrackProvider>> = vec![Arc::new(FakeProvider::playing(
        FakeProvider::track("No Cover", "Nobody", Some("http://art.test/missing.png")),
    ))];
    let server = TestServer::spawn(providers, Arc::new(FakeArtwork::default())).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("No Cover"));
    assert!(body.contains("data:image/svg+xml;base64,"));
}

#[tokio::test]
async fn test_same_request_renders_same_document() {
    let server = TestServer::spawn(playing("Windowlicker", "Aphex Twin"), red_artwork()).await;

    let first = server.get("/").await.text().await.unwrap();
    let second = server.get("/").await.text().await.unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// Error graphics
// ============================================================================

#[tokio::test]
async fn test_no_provider_configured_is_500() {
    let providers: Vec<Arc<dyn TrackProvider>> = vec![Arc::new(FakeProvider::unconfigured())];
    let server = TestServer::spawn(providers, Arc::new(FakeArtwork::default())).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), 500);
    assert_eq!(response.headers()["content-type"], "image/svg+xml");
    assert_eq!(response.headers()["cache-control"], "no-cache");
    let body = response.text().await.unwrap();
    assert!(body.starts_with("<svg"));
    assert!(body.contains("configured"));
}

#[tokio::test]
async fn test_no_tracks_renders_error_graphic() {
    let providers: Vec<Arc<dyn TrackProvider>> =
        vec![Arc::new(FakeProvider::history(Vec::new()))];
    let server = TestServer::spawn(providers, Arc::new(FakeArtwork::default())).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["cache-control"], "no-cache");
    assert!(response.text().await.unwrap().contains("No tracks available"));
}

#[tokio::test]
async fn test_provider_auth_failure_is_401() {
    let providers: Vec<Arc<dyn TrackProvider>> =
        vec![Arc::new(FakeProvider::failing(ProviderError::Authentication {
            service: "Fake".to_string(),
            details: "token revoked".to_string(),
        }))];
    let server = TestServer::spawn(providers, Arc::new(FakeArtwork::default())).await;

    let response = server.get("/").await;
    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["cache-control"], "no-cache");
}

#[tokio::test]
async fn test_provider_api_failure_is_502() {
    let providers: Vec<Arc<dyn TrackProvider>> =
        vec![Arc::new(FakeProvider::failing(ProviderError::Api {
            service: "Fake".to_string(),
            status: 503,
            message: "down".to_string(),
        }))];
    let server = TestServer::spawn(providers, Arc::new(FakeArtwork::default())).await;

    let response = server.get("/?compact=true").await;
    assert_eq!(response.status(), 502);
    let body = response.text().await.unwrap();
    assert!(body.contains(r#"width="350""#));
}
