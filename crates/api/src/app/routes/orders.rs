use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use tablefront_auth::{AuthzError, Permission};
use tablefront_infra::{ChangeOrderStatus, NewOrderItem, PlaceOrder};
use tablefront_orders::{Order, OrderId, OrderNumber, OrderStatus};
use tablefront_restaurants::RestaurantId;

use crate::app::routes::common::{json_body, parse};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order).get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/items", post(add_order_item))
        .route("/:id/status", post(update_order_status))
}

/// The customer who placed the order, the restaurant's owner, or an admin.
fn can_view(principal: &PrincipalContext, order: &Order) -> bool {
    let me = Some(principal.user_id());
    principal.is_admin() || order.user_id() == me || order.restaurant_owner_id() == me
}

/// Owners move orders through the kitchen flow; customers may only cancel
/// their own orders.
fn authorize_status_change(
    principal: &PrincipalContext,
    order: &Order,
    new_status: OrderStatus,
) -> Result<(), AuthzError> {
    if principal.is_admin() {
        return Ok(());
    }
    let me = Some(principal.user_id());
    if order.restaurant_owner_id() == me {
        return authz::require(principal, Permission::ORDERS_FULFIL);
    }
    if order.user_id() == me && new_status == OrderStatus::Cancelled {
        return authz::require(principal, Permission::ORDERS_PLACE);
    }
    Err(AuthzError::NotOwner)
}

/// POST /orders - place an order for the authenticated customer.
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::CreateOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    if let Err(e) = authz::require(&principal, Permission::ORDERS_PLACE) {
        return errors::authz_error_to_response(e);
    }
    let restaurant_id: RestaurantId = match parse(&body.restaurant_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let summary = match services
        .ordering
        .create_order(PlaceOrder {
            user_id: principal.user_id(),
            restaurant_id,
            items: body.items.into_iter().map(NewOrderItem::from).collect(),
            special_instructions: body.special_instructions,
        })
        .await
    {
        Ok(s) => s,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::CREATED, Json(summary)).into_response()
}

/// GET /orders - the caller's orders by default; `?order_number=`,
/// `?restaurant_id=` and `?status=` narrow the search. Results only include
/// orders the caller may see.
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListOrdersQuery>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, Permission::ORDERS_READ) {
        return errors::authz_error_to_response(e);
    }

    let result = if let Some(number) = query.order_number.as_deref() {
        let number: OrderNumber = match parse(number) {
            Ok(n) => n,
            Err(resp) => return resp,
        };
        services.ordering.find_order_by_number(&number).await.map(|o| vec![o])
    } else if let Some(restaurant_id) = query.restaurant_id.as_deref() {
        let restaurant_id: RestaurantId = match parse(restaurant_id) {
            Ok(id) => id,
            Err(resp) => return resp,
        };
        services.ordering.orders_for_restaurant(restaurant_id).await
    } else if let Some(status) = query.status.as_deref() {
        let status: OrderStatus = match parse(status) {
            Ok(s) => s,
            Err(resp) => return resp,
        };
        services.ordering.orders_by_status(status).await
    } else {
        services.ordering.orders_for_user(principal.user_id()).await
    };

    match result {
        Ok(orders) => {
            let items = orders
                .iter()
                .filter(|o| can_view(&principal, o))
                .map(dto::order_to_json)
                .collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, Permission::ORDERS_READ) {
        return errors::authz_error_to_response(e);
    }
    let order = match load_order(&services, &id).await {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    if !can_view(&principal, &order) {
        // Other people's orders are indistinguishable from missing ones.
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found");
    }

    (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
}

/// POST /orders/:id/items - only while the order is `PENDING`.
pub async fn add_order_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::OrderItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let order = match load_order(&services, &id).await {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    let Some(customer_id) = order.user_id() else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found");
    };
    if let Err(e) = authz::require_owner(&principal, Permission::ORDERS_PLACE, customer_id) {
        return errors::authz_error_to_response(e);
    }

    match services.ordering.add_order_item(order.id_typed(), body.into()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

/// POST /orders/:id/status - `{"status": "CONFIRMED", "expected_version": 1}`.
pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::UpdateOrderStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let new_status: OrderStatus = match parse(&body.status) {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let order = match load_order(&services, &id).await {
        Ok(o) => o,
        Err(resp) => return resp,
    };
    if let Err(e) = authorize_status_change(&principal, &order, new_status) {
        return errors::authz_error_to_response(e);
    }

    match services
        .ordering
        .update_order_status(ChangeOrderStatus {
            order_id: order.id_typed(),
            new_status,
            expected_version: body.expected_version,
            estimated_pickup_time: body.estimated_pickup_time,
        })
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

async fn load_order(services: &AppServices, id: &str) -> Result<Order, axum::response::Response> {
    let order_id: OrderId = parse(id)?;
    services
        .ordering
        .get_order(order_id)
        .await
        .map_err(errors::dispatch_error_to_response)
}
