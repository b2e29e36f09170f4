use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::Claims;
use crate::database::{DeleteResult, Document, DocumentId, InsertOneResult, UpdateResult};
use crate::error::{ApiError, ApiResult};
use crate::filter::{Filter, PageQuery};
use crate::middleware::JsonBody;
use crate::state::AppState;

use super::pick_fields;

const ITEM_UPDATE_FIELDS: &[&str] = &["quantity"];

#[derive(Debug, Deserialize)]
pub struct BrandQuery {
    pub brand: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandCountResponse {
    pub count_brand: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierCountResponse {
    pub supplier_items_count: u64,
}

/// GET /itemsCount
pub async fn items_count(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let count = state.items().count(Filter::all()).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /itemsCountByBrand?brand=
pub async fn items_count_by_brand(
    State(state): State<AppState>,
    Query(query): Query<BrandQuery>,
) -> ApiResult<BrandCountResponse> {
    let filter = Filter::all().eq_opt("brand", query.brand);
    let count_brand = state.items().count(filter).await?;
    Ok(Json(BrandCountResponse { count_brand }))
}

/// GET /items?page=&size=
pub async fn items_list(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<Document>> {
    let items = state.items().select_any(Filter::all(), page.window()).await?;
    Ok(Json(items))
}

/// GET /itemsByBrand?brand=&page=&size=
pub async fn items_by_brand(
    State(state): State<AppState>,
    Query(query): Query<BrandQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<Document>> {
    let filter = Filter::all().eq_opt("brand", query.brand);
    let items = state.items().select_any(filter, page.window()).await?;
    Ok(Json(items))
}

/// GET /item/:id - the item, or null when no document has that id
pub async fn item_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Option<Document>> {
    let id: DocumentId = id.parse()?;
    let item = state.items().select_one(Filter::by_id(id)).await?;
    Ok(Json(item))
}

/// GET /itemsBySupplier?email=&page=&size= (bearer token required)
///
/// Only the supplier named in the token may list their items.
pub async fn items_by_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SupplierQuery>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<Document>> {
    if !same_email(claims.email(), query.email.as_deref()) {
        return Err(ApiError::forbidden());
    }

    let filter = Filter::all().eq_opt("supplierEmail", query.email);
    let items = state.items().select_any(filter, page.window()).await?;
    Ok(Json(items))
}

/// GET /itemsCountBySupplier?email=
pub async fn items_count_by_supplier(
    State(state): State<AppState>,
    Query(query): Query<SupplierQuery>,
) -> ApiResult<SupplierCountResponse> {
    let filter = Filter::all().eq_opt("supplierEmail", query.email);
    let supplier_items_count = state.items().count(filter).await?;
    Ok(Json(SupplierCountResponse {
        supplier_items_count,
    }))
}

/// PUT /updateItem/:id - upsert the item's quantity
pub async fn item_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Document>,
) -> ApiResult<UpdateResult> {
    let id: DocumentId = id.parse()?;
    let set = pick_fields(&body, ITEM_UPDATE_FIELDS);
    let result = state.items().upsert(id, set).await?;
    Ok(Json(result))
}

/// DELETE /deleteItem/:id
pub async fn item_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeleteResult> {
    let id: DocumentId = id.parse()?;
    let result = state.items().delete(Filter::by_id(id)).await?;
    Ok(Json(result))
}

/// POST /addNewItem - store the body as-is
pub async fn item_add(
    State(state): State<AppState>,
    JsonBody(item): JsonBody<Document>,
) -> ApiResult<InsertOneResult> {
    let result = state.items().insert(item).await?;
    Ok(Json(result))
}

/// Strict equality between the token's email claim and the requested email.
/// Both absent counts as equal; a non-string claim never matches.
fn same_email(claimed: Option<&Value>, requested: Option<&str>) -> bool {
    match (claimed, requested) {
        (None, None) => true,
        (Some(Value::String(claimed)), Some(requested)) => claimed == requested,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_comparison_is_strict() {
        assert!(same_email(Some(&json!("a@b.com")), Some("a@b.com")));
        assert!(!same_email(Some(&json!("a@b.com")), Some("A@b.com")));
        assert!(!same_email(Some(&json!("a@b.com")), None));
        assert!(!same_email(None, Some("a@b.com")));
        assert!(!same_email(Some(&json!(null)), None));
        assert!(!same_email(Some(&json!(5)), Some("5")));
        assert!(same_email(None, None));
    }

    #[test]
    fn count_responses_use_wire_names() {
        assert_eq!(
            serde_json::to_value(BrandCountResponse { count_brand: 2 }).unwrap(),
            json!({ "countBrand": 2 })
        );
        assert_eq!(
            serde_json::to_value(SupplierCountResponse { supplier_items_count: 4 }).unwrap(),
            json!({ "supplierItemsCount": 4 })
        );
    }
}
