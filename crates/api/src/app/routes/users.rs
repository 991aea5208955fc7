use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use tablefront_accounts::UserRole;
use tablefront_auth::{AuthzError, Permission};
use tablefront_core::UserId;
use tablefront_infra::NewUser;
use tablefront_restaurants::RestaurantId;

use crate::app::routes::common::{json_body, parse};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::authz;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_user))
        .route("/:id", get(get_user))
        .route("/:id/deactivate", post(deactivate_user))
        .route(
            "/:id/favorites/:restaurant_id",
            put(add_favorite).delete(remove_favorite),
        )
}

/// POST /users - create the profile of the authenticated identity.
///
/// The requested role must be one the token grants (admins may pick any).
pub async fn register_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<dto::RegisterUserRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match json_body(payload) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let role: UserRole = match parse(&body.role) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let granted = principal.is_admin() || principal.roles().iter().any(|r| r.as_str() == role.as_str());
    if !granted {
        return errors::authz_error_to_response(AuthzError::Forbidden(format!("role:{role}")));
    }

    let user = match services
        .ordering
        .register_user(NewUser {
            user_id: Some(principal.user_id()),
            email: body.email,
            full_name: body.full_name,
            phone: body.phone,
            role,
        })
        .await
    {
        Ok(u) => u,
        Err(e) => return errors::dispatch_error_to_response(e),
    };

    (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response()
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if let Err(e) = authz::require_self(&principal, user_id) {
        return errors::authz_error_to_response(e);
    }

    match services.ordering.get_user(user_id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn deactivate_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let user_id: UserId = match parse(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if principal.user_id() != user_id {
        if let Err(e) = authz::require(&principal, Permission::USERS_MANAGE) {
            return errors::authz_error_to_response(e);
        }
    }

    match services.ordering.deactivate_user(user_id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn add_favorite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, restaurant_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (user_id, restaurant_id) = match parse_favorite(&principal, &id, &restaurant_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };

    match services.ordering.add_favorite(user_id, restaurant_id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

pub async fn remove_favorite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, restaurant_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (user_id, restaurant_id) = match parse_favorite(&principal, &id, &restaurant_id) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };

    match services.ordering.remove_favorite(user_id, restaurant_id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::dispatch_error_to_response(e),
    }
}

fn parse_favorite(
    principal: &PrincipalContext,
    id: &str,
    restaurant_id: &str,
) -> Result<(UserId, RestaurantId), axum::response::Response> {
    let user_id: UserId = parse(id)?;
    let restaurant_id: RestaurantId = parse(restaurant_id)?;
    authz::require_owner(principal, Permission::FAVORITES_MANAGE, user_id)
        .map_err(errors::authz_error_to_response)?;
    Ok((user_id, restaurant_id))
}
