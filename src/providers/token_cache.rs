//! Shared access-token cache.
//!
//! A single cache instance is shared by every request. The refresh runs
//! while the lock is held, so concurrent requests hitting an expired token
//! wait for the one refresh in flight and then reuse its result.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ProviderError;

/// Tokens are considered expired this long before the provider says so.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub value: String,
    /// Lifetime reported by the provider, if any.
    pub expires_in: Option<Duration>,
}

/// Something that can mint a fresh access token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken, ProviderError>;
}

struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() < expires_at,
            None => true,
        }
    }
}

pub struct TokenCache {
    source: Box<dyn TokenSource>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    /// Returns a valid token, refreshing it if missing or expired.
    pub async fn get(&self) -> Result<String, ProviderError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid() {
                return Ok(token.value.clone());
            }
            debug!("Access token expired, refreshing");
        }

        let fresh = self.source.fetch_token().await?;
        let expires_at = fresh
            .expires_in
            .map(|lifetime| Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN));
        info!("Obtained new access token");

        let value = fresh.value.clone();
        *cached = Some(CachedToken {
            value: fresh.value,
            expires_at,
        });
        Ok(value)
    }

    /// Drops the cached token, forcing a refresh on next use.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        *cached = None;
    }
}
