use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::registry::types::ErrorBody;

/// Bearer-token guard for organizer endpoints. An empty key disables it.
pub async fn admin_auth(
    State(api_key): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if api_key.is_empty() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*api_key);

    if authorized {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated admin request");
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                error: "Unauthorized".to_string(),
            }),
        )
            .into_response()
    }
}
