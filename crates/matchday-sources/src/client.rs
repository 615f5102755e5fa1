//! Shared HTTP plumbing for source adapters.
//!
//! Provides a cache-aside JSON GET: responses are kept in the key-value
//! cache under `api:{sport_id}:{url}` for an hour, so repeated syncs and
//! manual triggers don't hammer the upstream APIs.

use std::time::Duration;

use matchday_core::error::AppError;
use matchday_core::traits::KeyValueCache;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

/// Request timeout for upstream APIs.
const TIMEOUT: Duration = Duration::from_secs(10);

/// How long a cached upstream response stays fresh.
const CACHE_TTL_SECS: u64 = 3600;

/// HTTP client with response caching, shared by all adapters.
#[derive(Debug, Clone)]
pub struct SourceClient<C> {
    client: Client,
    cache: C,
}

impl<C: KeyValueCache> SourceClient<C> {
    pub fn new(cache: C) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("Matchday/0.3 (schedule-sync)")
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;
        Ok(Self { client, cache })
    }

    /// GETs a JSON document, consulting the cache first.
    ///
    /// Cache read/write failures degrade to a plain fetch; only the
    /// upstream request itself can fail the call.
    pub async fn get_json(&self, sport_id: i32, url: &str) -> Result<Value, AppError> {
        let cache_key = format!("api:{}:{}", sport_id, url);

        match self.cache.get(&cache_key).await {
            Ok(Some(cached)) => {
                if let Ok(value) = serde_json::from_str(&cached) {
                    debug!(sport_id, url, "upstream response served from cache");
                    return Ok(value);
                }
                // Unparseable cache entry, fall through to a real fetch
            }
            Ok(None) => {}
            Err(e) => warn!(sport_id, error = %e, "cache read failed"),
        }

        let value = self.fetch_json(url).await?;

        match serde_json::to_string(&value) {
            Ok(body) => {
                if let Err(e) = self
                    .cache
                    .set(&cache_key, &body, Some(CACHE_TTL_SECS))
                    .await
                {
                    warn!(sport_id, error = %e, "cache write failed");
                }
            }
            Err(e) => warn!(sport_id, error = %e, "response not cacheable"),
        }

        Ok(value)
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_err)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimitExceeded);
        }
        if !status.is_success() {
            return Err(AppError::ClientError(format!(
                "{} returned HTTP {}",
                url, status
            )));
        }

        response.json().await.map_err(map_reqwest_err)
    }
}

/// Maps reqwest failures onto the sync error classification.
pub fn map_reqwest_err(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout(TIMEOUT.as_secs())
    } else if e.is_connect() || e.is_request() {
        AppError::NetworkError(e.to_string())
    } else if e.is_decode() {
        AppError::ValidationError(e.to_string())
    } else {
        AppError::ClientError(e.to_string())
    }
}
