/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub database_url: String,
    pub database_max_connections: u32,

    // Identity provider (consumed, not managed)
    pub auth_domain: String,
    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_algorithms: Vec<Algorithm>,
    pub access_token_leeway_seconds: u64,

    pub jwks_url: Url,
    pub jwks_fetch_timeout: Duration,
    pub jwks_min_refresh_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source (the process env in production, a map in tests).
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port: u16 = parse_or(&var, "PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let app_env = AppEnv::parse(var("APP_ENV"));

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let database_url = required("DATABASE_URL")?;

        let database_max_connections: u32 = parse_or(&var, "DATABASE_MAX_CONNECTIONS", 5)?;
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid("DATABASE_MAX_CONNECTIONS"));
        }

        let auth_domain = required("AUTH_DOMAIN")?
            .trim()
            .trim_end_matches('/')
            .to_string();

        let auth_issuer = var("AUTH_ISSUER").unwrap_or_else(|| format!("https://{}/", auth_domain));

        let auth_audience = required("AUTH_AUDIENCE")?;

        let auth_algorithms = var("AUTH_ALGORITHMS")
            .unwrap_or_else(|| "RS256".to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Algorithm::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::Invalid("AUTH_ALGORITHMS"))?;
        if auth_algorithms.is_empty() {
            return Err(ConfigError::Invalid("AUTH_ALGORITHMS"));
        }

        let access_token_leeway_seconds = parse_or(&var, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;

        let jwks_url = var("JWKS_URL")
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth_domain));
        let jwks_url = Url::parse(&jwks_url).map_err(|_| ConfigError::Invalid("JWKS_URL"))?;

        let jwks_fetch_timeout =
            Duration::from_millis(parse_or(&var, "JWKS_FETCH_TIMEOUT_MS", 3000)?);

        let jwks_min_refresh_interval =
            Duration::from_secs(parse_or(&var, "JWKS_MIN_REFRESH_SECONDS", 30)?);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            database_url,
            database_max_connections,
            auth_domain,
            auth_issuer,
            auth_audience,
            auth_algorithms,
            access_token_leeway_seconds,
            jwks_url,
            jwks_fetch_timeout,
            jwks_min_refresh_interval,
        })
    }
}

/// `default` only when `key` is unset; a value that doesn't parse is an error.
fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}
