use axum::{
    extract::{Path, State},
    Json,
};

use crate::database::{Document, DocumentId, UpdateResult};
use crate::error::ApiResult;
use crate::filter::Filter;
use crate::middleware::JsonBody;
use crate::state::AppState;

use super::pick_fields;

/// Aggregates callers push; nothing here derives them from items
const OVERVIEW_FIELDS: &[&str] = &["totalCustomers", "laptopSold", "revenue"];

/// GET /overview - the first overview snapshot, or null
pub async fn overview_get(State(state): State<AppState>) -> ApiResult<Option<Document>> {
    let overview = state.overview().select_one(Filter::all()).await?;
    Ok(Json(overview))
}

/// PUT /updateOverview/:id
pub async fn overview_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Document>,
) -> ApiResult<UpdateResult> {
    let id: DocumentId = id.parse()?;
    let set = pick_fields(&body, OVERVIEW_FIELDS);
    let result = state.overview().upsert(id, set).await?;
    Ok(Json(result))
}
