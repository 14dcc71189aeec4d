//! Signing key set (JWKS) published by the identity provider.
//!
//! - `KeySet`: immutable snapshot indexed by `kid`
//! - `JwksFetcher`: HTTP client for the provider's `jwks.json` (bounded timeout, one retry)
//! - `KeyStore`: process-wide cache; reads are synchronous, refresh swaps the whole snapshot

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, Instant},
};

use jsonwebtoken::{
    DecodingKey,
    jwk::{JwkSet, PublicKeyUse},
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Key-set fetch failures. Kept apart from `AuthError`: an unreachable identity
/// provider is an availability problem, not a bad token.
#[derive(Debug, Error)]
pub enum JwksError {
    #[error("jwks http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, DecodingKey>,
}

impl KeySet {
    /// Keys without a `kid`, encryption keys, and key types jsonwebtoken can't
    /// use are skipped (logged, not fatal).
    pub fn from_jwks(jwks: &JwkSet) -> Self {
        let mut keys = HashMap::with_capacity(jwks.keys.len());

        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.as_deref() else {
                warn!("skipping jwk without kid");
                continue;
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                continue;
            }
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => {
                    keys.insert(kid.to_string(), key);
                }
                Err(err) => warn!(kid, error = %err, "skipping unusable jwk"),
            }
        }

        Self { keys }
    }

    pub fn get(&self, kid: &str) -> Option<&DecodingKey> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("KeySet")
            .field("kids", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct JwksFetcher {
    http: reqwest::Client,
    url: Url,
}

impl JwksFetcher {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, JwksError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the key set, retrying once on failure.
    pub async fn fetch(&self) -> Result<KeySet, JwksError> {
        match self.fetch_once().await {
            Ok(keys) => Ok(keys),
            Err(err) => {
                warn!(url = %self.url, error = %err, "jwks fetch failed, retrying once");
                self.fetch_once().await
            }
        }
    }

    async fn fetch_once(&self) -> Result<KeySet, JwksError> {
        let jwks: JwkSet = self
            .http
            .get(self.url.clone())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(KeySet::from_jwks(&jwks))
    }
}

/// Read-mostly key cache shared by every request.
pub struct KeyStore {
    current: RwLock<Arc<KeySet>>,
    fetcher: Option<JwksFetcher>,
    // Serializes refreshes; holds the time of the last attempt.
    last_refresh: tokio::sync::Mutex<Option<Instant>>,
    min_refresh_interval: Duration,
}

impl KeyStore {
    /// A key set that never changes (no identity provider behind it).
    #[cfg(test)]
    pub fn fixed(keys: KeySet) -> Self {
        Self {
            current: RwLock::new(Arc::new(keys)),
            fetcher: None,
            last_refresh: tokio::sync::Mutex::new(None),
            min_refresh_interval: Duration::ZERO,
        }
    }

    /// Starts empty; populated by `load` / `refresh`.
    pub fn remote(fetcher: JwksFetcher, min_refresh_interval: Duration) -> Self {
        Self {
            current: RwLock::new(Arc::new(KeySet::default())),
            fetcher: Some(fetcher),
            last_refresh: tokio::sync::Mutex::new(None),
            min_refresh_interval,
        }
    }

    pub fn snapshot(&self) -> Arc<KeySet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, kid: &str) -> Option<DecodingKey> {
        self.snapshot().get(kid).cloned()
    }

    fn replace(&self, keys: KeySet) {
        if keys.is_empty() {
            warn!("jwks contained no usable signing keys");
        }
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(keys);
    }

    /// Initial load at startup. Does not count against the refresh throttle.
    pub async fn load(&self) -> Result<(), JwksError> {
        let Some(fetcher) = &self.fetcher else {
            return Ok(());
        };
        let keys = fetcher.fetch().await?;
        info!(url = %fetcher.url(), keys = keys.len(), "jwks loaded");
        self.replace(keys);
        Ok(())
    }

    /// Re-fetch after a key-id miss.
    ///
    /// Concurrent callers queue on the same guard; anyone arriving within
    /// `min_refresh_interval` of the previous attempt returns without fetching
    /// and simply re-reads whatever that attempt installed.
    pub async fn refresh(&self) -> Result<(), JwksError> {
        let Some(fetcher) = &self.fetcher else {
            return Ok(());
        };

        let mut last = self.last_refresh.lock().await;
        if let Some(at) = *last
            && at.elapsed() < self.min_refresh_interval
        {
            return Ok(());
        }
        *last = Some(Instant::now());

        let keys = fetcher.fetch().await?;
        info!(url = %fetcher.url(), keys = keys.len(), "jwks refreshed");
        self.replace(keys);
        Ok(())
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("keys", &self.snapshot())
            .field("fetcher", &self.fetcher.as_ref().map(JwksFetcher::url))
            .field("min_refresh_interval", &self.min_refresh_interval)
            .finish()
    }
}
