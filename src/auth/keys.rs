use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::DecodingKey;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const GOOGLE_SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_MAX_AGE_SECS: u64 = 3600;
// Upper bound on how long a fetched key set is trusted, whatever `max-age` says.
const MAX_CACHE_AGE_SECS: u64 = 24 * 3600;
// An unknown `kid` refetches the keys at most this often.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum KeyFetchError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Key endpoint returned {0}")]
    BadStatus(reqwest::StatusCode),
    #[error("Invalid signing key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),
    #[error("No signing key with id {0}")]
    UnknownKeyId(String),
}

#[derive(Clone)]
struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Fetches and caches the public keys Firebase signs ID tokens with.
///
/// The cache lifetime follows the `max-age` of the key endpoint's `Cache-Control` header.
pub struct PublicKeyManager {
    client: Client,
    jwks_url: String,
    cache: Arc<RwLock<Option<CachedKeys>>>,
}

impl Default for PublicKeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PublicKeyManager {
    pub fn new() -> Self {
        Self::with_url(GOOGLE_SECURE_TOKEN_JWKS_URL)
    }

    pub fn with_url(jwks_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            jwks_url: jwks_url.into(),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the key for `kid`, refetching when the cache is stale or, at most once per
    /// minute, when `kid` is unknown.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, KeyFetchError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = &*cache {
                if Instant::now() < cached.expires_at {
                    if let Some(key) = cached.keys.get(kid) {
                        return Ok(key.clone());
                    }
                    if cached.fetched_at.elapsed() < MIN_REFETCH_INTERVAL {
                        return Err(KeyFetchError::UnknownKeyId(kid.to_string()));
                    }
                }
            }
        }

        // Unknown kid or stale cache: Google may have rotated keys.
        self.refresh_keys().await?;

        let cache = self.cache.read().await;
        cache
            .as_ref()
            .and_then(|cached| cached.keys.get(kid).cloned())
            .ok_or_else(|| KeyFetchError::UnknownKeyId(kid.to_string()))
    }

    async fn refresh_keys(&self) -> Result<(), KeyFetchError> {
        let response = self.client.get(&self.jwks_url).send().await?;

        if !response.status().is_success() {
            return Err(KeyFetchError::BadStatus(response.status()));
        }

        let max_age = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_MAX_AGE_SECS)
            .min(MAX_CACHE_AGE_SECS);

        let jwks: JwkSet = response.json().await?;

        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            if let Some(kid) = &jwk.common.key_id {
                keys.insert(kid.clone(), DecodingKey::from_jwk(jwk)?);
            }
        }
        debug!(count = keys.len(), max_age, "refreshed ID token signing keys");

        let fetched_at = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys,
            fetched_at,
            expires_at: fetched_at + Duration::from_secs(max_age),
        });

        Ok(())
    }
}

pub(crate) fn parse_max_age(cache_control: &str) -> Option<u64> {
    cache_control.split(',').find_map(|part| {
        part.trim()
            .strip_prefix("max-age=")
            .and_then(|age| age.parse::<u64>().ok())
    })
}
