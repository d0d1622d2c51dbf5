use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::auth::{bearer_token, IdentityProvider, UserIdentity};
use crate::catalog::item::{AggregationResult, SourceId};
use crate::catalog::{Aggregator, SearchQuery};
use crate::rates::RatesClient;
use crate::view;
use crate::wishlist::{WishlistEntry, WishlistError, WishlistStore};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub rates: Arc<RatesClient>,
    pub wishlist: Arc<dyn WishlistStore>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/search", get(search))
        .route("/api/featured", get(featured))
        .route("/api/items/{source}/{external_id}", get(item_detail))
        .route("/api/rates", get(rates))
        .route("/api/wishlist", get(wishlist_list).post(wishlist_add))
        .route("/api/wishlist/{external_id}", delete(wishlist_remove))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn detail_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}

fn unauthenticated() -> Response {
    detail_response(StatusCode::UNAUTHORIZED, "unauthenticated")
}

/// Resolve the bearer token, if one was sent and is valid.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Option<UserIdentity> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = bearer_token(value)?;
    state.identity.resolve(token).await
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Landing page data: the featured shelf plus whoever is signed in.
async fn index(State(state): State<AppState>, headers: HeaderMap) -> Json<view::PageView> {
    let user = authenticate(&state, &headers).await;
    let result = state.aggregator.featured().await;
    Json(view::present(&result, user))
}

#[derive(serde::Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    // Validation happens before any upstream call is made.
    let query = match SearchQuery::parse(&params.query) {
        Ok(q) => q,
        Err(e) => return detail_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()),
    };
    let result = state.aggregator.search(&query).await;
    Json(result).into_response()
}

async fn featured(State(state): State<AppState>) -> Json<AggregationResult> {
    Json(state.aggregator.featured().await)
}

async fn item_detail(
    State(state): State<AppState>,
    Path((source, external_id)): Path<(String, String)>,
) -> Response {
    let Ok(source) = source.parse::<SourceId>() else {
        return detail_response(StatusCode::NOT_FOUND, "not found");
    };
    match state.aggregator.detail(source, &external_id).await {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => detail_response(StatusCode::NOT_FOUND, "not found"),
        Err(e) => {
            tracing::warn!(source = %source, id = %external_id, error = %e, "detail lookup failed");
            detail_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

async fn rates(State(state): State<AppState>) -> Response {
    match state.rates.daily().await {
        Ok(table) => Json(table).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "rates fetch failed");
            detail_response(StatusCode::BAD_GATEWAY, &e.to_string())
        }
    }
}

#[derive(serde::Serialize)]
struct WishlistOut {
    items: Vec<WishlistEntry>,
}

async fn wishlist_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(user) = authenticate(&state, &headers).await else {
        return unauthenticated();
    };
    let items = state.wishlist.list(user.id).await;
    Json(WishlistOut { items }).into_response()
}

#[derive(serde::Deserialize)]
struct WishlistAddReq {
    source: SourceId,
    external_id: String,
}

async fn wishlist_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<WishlistAddReq>,
) -> Response {
    let Some(user) = authenticate(&state, &headers).await else {
        return unauthenticated();
    };
    match state
        .wishlist
        .add(user.id, body.source, &body.external_id)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e @ WishlistError::Duplicate) => {
            detail_response(StatusCode::CONFLICT, &e.to_string())
        }
        Err(e) => detail_response(StatusCode::NOT_FOUND, &e.to_string()),
    }
}

async fn wishlist_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(external_id): Path<String>,
) -> Response {
    let Some(user) = authenticate(&state, &headers).await else {
        return unauthenticated();
    };
    match state.wishlist.remove(user.id, &external_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => detail_response(StatusCode::NOT_FOUND, &e.to_string()),
    }
}
