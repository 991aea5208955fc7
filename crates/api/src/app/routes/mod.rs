use axum::{routing::get, Router};

pub mod admin;
pub mod common;
pub mod notifications;
pub mod orders;
pub mod restaurants;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/notifications", get(notifications::list_notifications))
        .nest("/users", users::router())
        .nest("/restaurants", restaurants::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
}
