use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::database::{Document, DocumentId, InsertOneResult, UpdateResult};
use crate::error::ApiResult;
use crate::filter::Filter;
use crate::middleware::JsonBody;
use crate::state::AppState;

use super::pick_fields;

const PROFILE_COUNTERS: &[&str] = &["added", "deleted", "delivered"];

#[derive(Debug, Deserialize)]
pub struct ProfileQuery {
    pub email: Option<String>,
}

/// GET /userProfile?email= - first profile with that email, or null
pub async fn profile_get(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> ApiResult<Option<Document>> {
    let filter = Filter::all().eq_opt("email", query.email);
    let profile = state.profile().select_one(filter).await?;
    Ok(Json(profile))
}

/// POST /userProfile
pub async fn profile_add(
    State(state): State<AppState>,
    JsonBody(profile): JsonBody<Document>,
) -> ApiResult<InsertOneResult> {
    let result = state.profile().insert(profile).await?;
    Ok(Json(result))
}

/// PUT /updateProfile/:id - upsert the supplier's activity counters
pub async fn profile_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Document>,
) -> ApiResult<UpdateResult> {
    let id: DocumentId = id.parse()?;
    let set = pick_fields(&body, PROFILE_COUNTERS);
    let result = state.profile().upsert(id, set).await?;
    Ok(Json(result))
}
