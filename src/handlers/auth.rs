use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ApiResult;
use crate::middleware::JsonBody;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

/// POST /getToken - sign whatever payload the caller sends.
///
/// No credential check happens here; the payload (typically `{ "email": .. }`)
/// becomes the token's claims, valid for one day.
pub async fn get_token(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<Map<String, Value>>,
) -> ApiResult<TokenResponse> {
    debug!(claims = payload.len(), "Issuing access token");
    let access_token = state.tokens.issue(payload)?;
    Ok(Json(TokenResponse { access_token }))
}
