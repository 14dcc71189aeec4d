/*
 * Responsibility
 * - Config読み込み → 依存生成 (PgPool / DrinkRepo / AuthService) → Router 組み立て
 * - Middleware の適用 (security headers / CORS / request-id / trace / timeout)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    error::AppError,
    middleware,
    repos::PgDrinkRepo,
    services::auth::build_auth_service,
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG wins. To see every authorization decision:
    // RUST_LOG=info,coffee_shop_api::middleware::auth=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // A panicking handler outside production takes the service down with it.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let drinks = Arc::new(PgDrinkRepo::new(pool));
    let auth = build_auth_service(config).await?;

    Ok(AppState::new(drinks, auth))
}

/// Routes + fallbacks, without the transport layers (tests drive this directly).
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api::v1::routes(&state))
        .method_not_allowed_fallback(|| async { AppError::MethodNotAllowed })
        .fallback(|| async { AppError::NotFound })
        .with_state(state)
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = router(state);
    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
