//! Server error types with their HTTP renderings.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::profile::validate::ValidationErrors;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    // Auth errors
    AuthFailNoToken,
    AuthFailTokenWrongFormat,
    AuthFailInvalidSession,
    AuthFailCtxNotInRequestExt,

    // Profile errors
    ProfileNotFound,
    ProfileAlreadyExists,
    Validation(ValidationErrors),

    // Request errors
    UnsupportedMediaType,
    BadRequest(String),

    // Generic errors
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Error::AuthFailNoToken => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "No auth token found" }),
            ),
            Error::AuthFailTokenWrongFormat => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Auth token wrong format" }),
            ),
            Error::AuthFailInvalidSession => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid or expired session" }),
            ),
            Error::AuthFailCtxNotInRequestExt => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": "Auth context missing from request" }),
            ),
            Error::ProfileNotFound => (
                StatusCode::NOT_FOUND,
                json!({ "message": "Profile not found" }),
            ),
            Error::ProfileAlreadyExists => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Profile already exists" }),
            ),
            Error::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "errors": errors }),
            ),
            Error::UnsupportedMediaType => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                json!({ "message": "Expected multipart/form-data or application/x-www-form-urlencoded" }),
            ),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": msg })),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<media_store::Error> for Error {
    fn from(err: media_store::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}
