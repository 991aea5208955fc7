use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use tablefront_auth::Permission;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::authz;
use crate::context::PrincipalContext;

/// GET /notifications - the caller's inbox, newest first.
pub async fn list_notifications(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authz::require(&principal, Permission::NOTIFICATIONS_READ) {
        return errors::authz_error_to_response(e);
    }

    let items = services.notifications.for_user(principal.user_id());
    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
