use std::str::FromStr;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};

use tablefront_core::DomainError;

use crate::app::errors;

/// Parse a path or query value (ids, statuses); failures become 400s.
pub fn parse<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(errors::domain_error_to_response)
}

/// Unwrap a JSON body; malformed or mistyped payloads (a negative quantity,
/// a missing field) get the same `validation_error` body as domain checks.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        errors::json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
    })
}
