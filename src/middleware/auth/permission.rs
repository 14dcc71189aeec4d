//! Route-level permission gate: `Authorization: Bearer <jwt>` → verify → permission check
//! → `Claims` を extensions に入れる
//!
//! - 失敗時は handler を一切実行しない (永続化層に触れる前に short-circuit)
//! - kid が指定されていて key set に無い場合のみ、JWKS を一度だけ取り直して再検証する

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Clone)]
struct PermissionGate {
    state: AppState,
    permission: &'static str,
}

/// Wrap a method router so it only runs for tokens carrying `permission`.
///
/// 例：
/// ```ignore
/// .route("/drinks-detail", permission::require(get(list_drink_details), &state, "get:drinks-detail"))
/// ```
pub fn require(
    route: MethodRouter<AppState>,
    state: &AppState,
    permission: &'static str,
) -> MethodRouter<AppState> {
    let gate = PermissionGate {
        state: state.clone(),
        permission,
    };
    route.route_layer(middleware::from_fn_with_state(gate, permission_middleware))
}

async fn permission_middleware(
    State(gate): State<PermissionGate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Non-UTF-8 header values count as present-but-malformed.
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default());

    let auth = &gate.state.auth;
    let result = match auth.authorize(gate.permission, authorization) {
        // A token without a kid can't be helped by a refetch.
        Err(err) if err.is_key_miss() => {
            // The provider may have rotated its keys since we last fetched.
            if let Err(fetch_err) = auth.keys().refresh().await {
                tracing::warn!(error = %fetch_err, "jwks refresh failed");
                return Err(fetch_err.into());
            }
            auth.authorize(gate.permission, authorization)
        }
        other => other,
    };

    let claims = match result {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                kind = err.kind().code(),
                status = err.status().as_u16(),
                permission = gate.permission,
                "authorization failed"
            );
            return Err(err.into());
        }
    };

    tracing::debug!(sub = %claims.sub, permission = gate.permission, "authorized");

    // middleware → handler への受け渡し
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
