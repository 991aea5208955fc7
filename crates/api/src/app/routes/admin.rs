//! Platform administration: the restaurant approval gate and the analytics
//! dashboard.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use tablefront_auth::Permission;
use tablefront_restaurants::RestaurantId;

use crate::app::routes::common::{json_body, parse};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/restaurants/:id/approve", post(approve_restaurant))
        .route("/restaurants/:id/block", post(block_restaurant))
        .route("/analytics", get(analytics))
}

/// POST /admin/restaurants/:id/approve
pub async fn approve_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, Permission::RESTAURANTS_APPROVE) {
        return errors::authz_error_to_response(e);
    }
    let restaurant_id: RestaurantId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ordering.approve_restaurant(restaurant_id).await {
        Ok(r) => (StatusCode::OK, Json(dto::restaurant_to_json(&r))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /admin/restaurants/:id/block - `{"reason": "..."}`
pub async fn block_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::BlockRestaurantRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if let Err(e) = authz::require(&principal, Permission::RESTAURANTS_APPROVE) {
        return errors::authz_error_to_response(e);
    }
    let restaurant_id: RestaurantId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ordering.block_restaurant(restaurant_id, body.reason).await {
        Ok(r) => (StatusCode::OK, Json(dto::restaurant_to_json(&r))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// GET /admin/analytics - counters are eventually consistent with commands.
pub async fn analytics(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, Permission::ANALYTICS_READ) {
        return errors::authz_error_to_response(e);
    }

    let snapshot = services.analytics.snapshot();
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "applied_events": services.analytics.applied(),
            "snapshot": snapshot,
        })),
    )
        .into_response()
}
