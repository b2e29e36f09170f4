use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Bearer-token middleware for protected routes.
///
/// A missing `Authorization` header is a 401; any token that fails to verify
/// is a 403. On success the decoded [`Claims`](crate::auth::Claims) are put
/// into the request extensions for the handler.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = state
        .tokens
        .verify_header(request.headers().get(AUTHORIZATION))?;

    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
