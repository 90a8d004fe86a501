use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;

use crate::agenda::Viewer;
use crate::db::{tokens, users};

/// Require a valid bearer token. On success the resolved [`Viewer`] is placed
/// in the request extensions.
pub async fn require_bearer_auth(
    State(pool): State<SqlitePool>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized_response("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized_response("Invalid authorization scheme, expected Bearer"))?;

    let user_id = tokens::validate_token(&pool, token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "token validation failed");
            unauthorized_response("Token validation failed")
        })?
        .ok_or_else(|| unauthorized_response("Invalid or expired token"))?;

    let user = users::get_user_by_id(&pool, &user_id)
        .await
        .map_err(|_| unauthorized_response("Token validation failed"))?
        .ok_or_else(|| unauthorized_response("Token owner no longer exists"))?;

    request
        .extensions_mut()
        .insert(Viewer::new(user.id, user.username));

    Ok(next.run(request).await)
}

fn unauthorized_response(msg: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer realm=\"SmartTask Planner\"")],
        msg,
    )
        .into_response()
}
