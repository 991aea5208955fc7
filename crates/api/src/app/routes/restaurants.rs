use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use tablefront_auth::Permission;
use tablefront_core::UserId;
use tablefront_infra::{DispatchError, NewRestaurant};
use tablefront_restaurants::{Restaurant, RestaurantId, RestaurantStatus};

use crate::app::routes::common::{json_body, parse};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_restaurant).get(list_restaurants))
        .route("/:id", get(get_restaurant))
        .route("/:id/open", post(open_restaurant))
        .route("/:id/close", post(close_restaurant))
        .route("/:id/deactivate", post(deactivate_restaurant))
        .route("/:id/reactivate", post(reactivate_restaurant))
        .route("/:id/rate", post(rate_restaurant))
}

/// POST /restaurants - the caller becomes the owner; starts out `PENDING`.
pub async fn register_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::RegisterRestaurantRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if let Err(e) = authz::require(&principal, Permission::RESTAURANTS_REGISTER) {
        return errors::authz_error_to_response(e);
    }

    let restaurant = match services
        .ordering
        .register_restaurant(NewRestaurant {
            owner_id: principal.user_id(),
            name: body.name,
            email: body.email,
            address: body.address,
            phone: body.phone,
            cuisine_type: body.cuisine_type,
        })
        .await
    {
        Ok(r) => r,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::CREATED, Json(dto::restaurant_to_json(&restaurant))).into_response()
}

/// GET /restaurants - `?status=` or `?owner_id=`; otherwise the restaurants
/// currently accepting orders.
pub async fn list_restaurants(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListRestaurantsQuery>,
) -> axum::response::Response {
    let result = match (query.status.as_deref(), query.owner_id.as_deref()) {
        (Some(status), _) => {
            let status: RestaurantStatus = match parse(status) {
                Ok(s) => s,
                Err(resp) => return resp,
            };
            services.ordering.restaurants_by_status(status).await
        }
        (None, Some(owner_id)) => {
            let owner_id: UserId = match parse(owner_id) {
                Ok(id) => id,
                Err(resp) => return resp,
            };
            services.ordering.restaurants_by_owner(owner_id).await
        }
        (None, None) => services.ordering.accepting_restaurants().await,
    };

    match result {
        Ok(restaurants) => {
            let items = restaurants.iter().map(dto::restaurant_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let restaurant_id: RestaurantId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ordering.get_restaurant(restaurant_id).await {
        Ok(r) => (StatusCode::OK, Json(dto::restaurant_to_json(&r))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn open_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    manage(services, principal, id, Lifecycle::Open).await
}

pub async fn close_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    manage(services, principal, id, Lifecycle::Close).await
}

pub async fn deactivate_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    manage(services, principal, id, Lifecycle::Deactivate).await
}

pub async fn reactivate_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    manage(services, principal, id, Lifecycle::Reactivate).await
}

pub async fn rate_restaurant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::RateRestaurantRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if let Err(e) = authz::require(&principal, Permission::RESTAURANTS_RATE) {
        return errors::authz_error_to_response(e);
    }
    let restaurant_id: RestaurantId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.ordering.rate_restaurant(restaurant_id, body.rating).await {
        Ok(r) => (StatusCode::OK, Json(dto::restaurant_to_json(&r))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Open,
    Close,
    Deactivate,
    Reactivate,
}

/// Owner-only lifecycle changes (admins bypass ownership).
async fn manage(
    services: Arc<AppServices>,
    principal: PrincipalContext,
    id: String,
    action: Lifecycle,
) -> axum::response::Response {
    let restaurant_id: RestaurantId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let current = match services.ordering.get_restaurant(restaurant_id).await {
        Ok(r) => r,
        Err(e) => return errors::dispatch_error_to_response(e),
    };
    let Some(owner_id) = current.owner_id() else {
        return errors::dispatch_error_to_response(DispatchError::NotFound);
    };
    if let Err(e) = authz::require_owner(&principal, Permission::RESTAURANTS_MANAGE, owner_id) {
        return errors::authz_error_to_response(e);
    }

    let result: Result<Restaurant, DispatchError> = match action {
        Lifecycle::Open => services.ordering.open_restaurant(restaurant_id).await,
        Lifecycle::Close => services.ordering.close_restaurant(restaurant_id).await,
        Lifecycle::Deactivate => services.ordering.deactivate_restaurant(restaurant_id).await,
        Lifecycle::Reactivate => services.ordering.reactivate_restaurant(restaurant_id).await,
    };

    match result {
        Ok(r) => (StatusCode::OK, Json(dto::restaurant_to_json(&r))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}
