use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use super::{
    http_cache, log_requests, metrics::metrics_handler, params::WidgetQuery, state::*,
    ServerConfig, WidgetDefaults,
};

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    debug!("Up for {}", format_uptime(state.start_time.elapsed()));
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"))],
        "OK",
    )
}

fn render_rng(seed: Option<u64>) -> StdRng {
    StdRng::seed_from_u64(seed.unwrap_or_else(|| rand::rng().random()))
}

async fn get_widget(
    State(state): State<ServerState>,
    query: Result<Query<WidgetQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            debug!("Unreadable query string ({}), using defaults", rejection);
            WidgetQuery::default()
        }
    };
    let params = query.resolve(&state.widget_defaults);
    let mut rng = render_rng(state.config.render_seed);

    let rendered = state.pipeline.render_or_error(&params, &mut rng).await;

    let mut response = Response::builder().header(header::CONTENT_TYPE, SVG_CONTENT_TYPE);
    let status = if rendered.error.is_some() {
        response = response.header(header::CACHE_CONTROL, "no-cache");
        // An empty-history graphic still needs a body to be seen.
        match StatusCode::from_u16(rendered.status) {
            Ok(StatusCode::NO_CONTENT) => StatusCode::OK,
            Ok(code) => code,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    } else {
        StatusCode::OK
    };

    response
        .status(status)
        .body(Body::from(rendered.svg))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

impl ServerState {
    fn new(
        config: ServerConfig,
        pipeline: GuardedPipeline,
        widget_defaults: WidgetDefaults,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            pipeline,
            widget_defaults,
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    pipeline: GuardedPipeline,
    widget_defaults: WidgetDefaults,
) -> Router {
    let state = ServerState::new(config.clone(), pipeline, widget_defaults);

    let health_routes: Router = Router::new()
        .route("/health", get(health))
        .with_state(state.clone());

    // Every path other than /health renders the widget.
    let widget_routes: Router = Router::new()
        .route("/", get(get_widget))
        .fallback(get_widget)
        .layer(middleware::from_fn_with_state(
            config.cache_max_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    health_routes
        .merge(widget_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    pipeline: GuardedPipeline,
    widget_defaults: WidgetDefaults,
) -> Result<()> {
    let port = config.port;

    if let Some(metrics_port) = config.metrics_port {
        let metrics_listener =
            tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port)).await?;
        info!("Metrics available at port {}!", metrics_port);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
                tracing::error!("Metrics server stopped: {}", e);
            }
        });
    }

    let app = make_app(config, pipeline, widget_defaults);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Ready to serve at port {}!", port);

    Ok(axum::serve(listener, app).await?)
}
