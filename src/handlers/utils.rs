use axum::{extract::rejection::JsonRejection, Json};
use uuid::Uuid;

use crate::error::ApiError;

/// Parse an id taken from the URL; malformed ids are a client error, not a 404.
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request(format!("Invalid {}: must be a UUID", what)))
}

/// Unwrap a JSON body, reporting malformed payloads in the API error envelope.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))),
    }
}
