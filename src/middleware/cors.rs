//! CORS policy for the drinks frontend.
//!
//! Policy:
//! - Development: any origin, no credentials.
//! - Production: exact-match allowlist from `CORS_ALLOWED_ORIGINS`. An empty list
//!   means no CORS headers at all.
//!
//! Only the headers/methods the drinks API actually uses are allowed
//! (`Authorization` for the bearer token, `PATCH` for updates).

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

pub fn apply(router: Router, config: &Config) -> Router {
    let allow_origin = if config.app_env.is_production() {
        let allowed: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
            allowed.iter().any(|v| v == origin)
        })
    } else {
        AllowOrigin::from(Any)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(Duration::from_secs(60 * 10));

    router.layer(cors)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn config(app_env: &str, origins: &str) -> Config {
        let env = [
            ("DATABASE_URL", "postgres://localhost/coffee"),
            ("AUTH_DOMAIN", "coffee.eu.auth0.com"),
            ("AUTH_AUDIENCE", "drinks"),
            ("APP_ENV", app_env),
            ("CORS_ALLOWED_ORIGINS", origins),
        ];
        Config::from_lookup(|key| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    async fn allow_origin_for(config: &Config, origin: &str) -> Option<HeaderValue> {
        let router = apply(Router::new().route("/drinks", get(|| async { "ok" })), config);
        let res = router
            .oneshot(
                Request::get("/drinks")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn development_allows_any_origin() {
        let config = config("development", "");
        let allowed = allow_origin_for(&config, "http://localhost:8100").await;
        assert_eq!(allowed.unwrap(), "*");
    }

    #[tokio::test]
    async fn production_only_echoes_listed_origins() {
        let config = config("production", "https://shop.example");

        let allowed = allow_origin_for(&config, "https://shop.example").await;
        assert_eq!(allowed.unwrap(), "https://shop.example");

        let denied = allow_origin_for(&config, "https://evil.example").await;
        assert!(denied.is_none());
    }
}
