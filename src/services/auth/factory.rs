/// Factory: build `AuthService` from application `Config`.
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::services::auth::{AuthService, JwksError, JwksFetcher, KeyStore};

pub async fn build_auth_service(config: &Config) -> Result<Arc<AuthService>, JwksError> {
    let fetcher = JwksFetcher::new(config.jwks_url.clone(), config.jwks_fetch_timeout)?;
    let keys = Arc::new(KeyStore::remote(fetcher, config.jwks_min_refresh_interval));

    // An unreachable identity provider at boot is not fatal: the first key-id miss
    // triggers another fetch, and until then every protected route fails closed.
    if let Err(err) = keys.load().await {
        warn!(url = %config.jwks_url, error = %err, "initial jwks fetch failed");
    }

    let auth = AuthService::new(
        keys,
        &config.auth_issuer,
        &config.auth_audience,
        &config.auth_algorithms,
        config.access_token_leeway_seconds,
    );

    info!(
        domain = %config.auth_domain,
        issuer = %config.auth_issuer,
        audience = %config.auth_audience,
        algorithms = ?config.auth_algorithms,
        "access token verification configured"
    );

    Ok(Arc::new(auth))
}
