//! Error types for the HTTP layer
//!
//! Every failure renders as `{"success": false, "message": ...}`. The
//! underlying detail travels in a response extension and is only written
//! into the body (as `error`) by [`attach_error_detail`], which the router
//! installs in development mode.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, rejection::JsonRejection, Request},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::blob::BlobError;

const MAX_ERROR_BODY: usize = 64 * 1024;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Duplicate resource (400, matching the client's expectations)
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid credentials (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Resource not found or not owned by the caller (404)
    #[error("{0}")]
    NotFound(String),

    /// Unsupported method or action (405)
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Upload over the size limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// sanctum-common error
    #[error(transparent)]
    Common(#[from] sanctum_common::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Blob storage error
    #[error("Blob storage error: {0}")]
    Blob(#[from] BlobError),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Internal detail for a failed request
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl ApiError {
    pub fn unauthorized(message: &str) -> Self {
        ApiError::Unauthorized(message.to_string())
    }

    pub fn method_not_allowed() -> Self {
        ApiError::MethodNotAllowed("Method not allowed".to_string())
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        use sanctum_common::Error as Common;

        match self {
            ApiError::BadRequest(msg) | ApiError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg.clone()),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            ApiError::Common(Common::InvalidInput(msg)) | ApiError::Common(Common::Conflict(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Common(Common::NotFound(msg)) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Blob(BlobError::InvalidKey(_)) => {
                (StatusCode::BAD_REQUEST, "Invalid file name".to_string())
            }
            ApiError::Internal(_)
            | ApiError::Common(_)
            | ApiError::Database(_)
            | ApiError::Blob(_)
            | ApiError::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let detail = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), "Request failed: {}", detail);
        }

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        let mut response = (status, body).into_response();
        response.extensions_mut().insert(ErrorDetail(detail));
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("File too large. Maximum size is 50MB.".to_string())
        } else {
            ApiError::BadRequest(format!("Invalid multipart data: {}", err.body_text()))
        }
    }
}

/// Middleware: copy the internal error detail into the JSON body as `error`
pub async fn attach_error_detail(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => return (parts.status, Json(json!({ "success": false }))).into_response(),
    };

    let mut value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(object) = value.as_object_mut() {
        object.insert("error".to_string(), Value::String(detail));
    }

    let Ok(rendered) = serde_json::to_vec(&value) else {
        return Response::from_parts(parts, Body::from(bytes));
    };
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(rendered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::unauthorized("x"), StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::method_not_allowed(), StatusCode::METHOD_NOT_ALLOWED),
            (ApiError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (
                ApiError::Common(sanctum_common::Error::Conflict("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Common(sanctum_common::Error::NotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Common(sanctum_common::Error::Internal("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_internal_errors_hide_detail() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        let detail = response.extensions().get::<ErrorDetail>().cloned().unwrap();
        let json = body_json(response).await;

        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Internal server error");
        assert!(json.get("error").is_none());
        assert!(detail.0.contains("disk on fire"));
    }
}
