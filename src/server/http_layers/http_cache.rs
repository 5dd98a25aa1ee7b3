//! Shared-cache hinting middleware

use axum::{
    body::Body,
    extract::State,
    http::{header::CACHE_CONTROL, HeaderValue, Request},
    middleware::Next,
    response::IntoResponse,
};

/// Adds `Cache-Control: s-maxage=<n>` unless the handler already chose a
/// cache policy (error graphics opt out with `no-cache`).
pub async fn http_cache(
    State(max_age_sec): State<u32>,
    request: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    let mut response = next.run(request).await.into_response();

    if !response.headers().contains_key(CACHE_CONTROL) {
        if let Ok(value) = HeaderValue::from_str(&format!("s-maxage={}", max_age_sec)) {
            response.headers_mut().insert(CACHE_CONTROL, value);
        }
    }

    response
}
