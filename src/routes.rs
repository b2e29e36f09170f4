use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{auth, items, overview, profile, system};
use crate::middleware::require_bearer;
use crate::state::AppState;

/// Build the full application router around an already-opened store
pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let request_logging = state.config.api.enable_request_logging;

    let router = Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        .merge(auth_routes())
        .merge(item_routes())
        .merge(supplier_routes(state.clone()))
        .merge(overview_routes())
        .merge(profile_routes())
        // Global middleware
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive());

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn auth_routes() -> Router<AppState> {
    Router::new().route("/getToken", post(auth::get_token))
}

fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/itemsCount", get(items::items_count))
        .route("/itemsCountByBrand", get(items::items_count_by_brand))
        .route("/items", get(items::items_list))
        .route("/itemsByBrand", get(items::items_by_brand))
        .route("/item/:id", get(items::item_get))
        .route("/itemsCountBySupplier", get(items::items_count_by_supplier))
        .route("/updateItem/:id", put(items::item_update))
        .route("/deleteItem/:id", delete(items::item_delete))
        .route("/addNewItem", post(items::item_add))
}

/// Routes behind the bearer-token check
fn supplier_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/itemsBySupplier", get(items::items_by_supplier))
        .route_layer(middleware::from_fn_with_state(state, require_bearer))
}

fn overview_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(overview::overview_get))
        .route("/updateOverview/:id", put(overview::overview_update))
}

fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/userProfile",
            get(profile::profile_get).post(profile::profile_add),
        )
        .route("/updateProfile/:id", put(profile::profile_update))
}
