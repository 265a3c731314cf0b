//! API error types and JSON error response formatting.
//!
//! Every failure leaves the endpoint as `{error, kind, details?}`, where
//! `error` is the human-readable message and `kind` a stable code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use aura_chat::ChatError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 - missing or malformed request.
    BadRequest(String),
    /// A failure from the command pipeline.
    Command(ChatError),
}

impl ApiError {
    /// Status, kind and details for this error.
    fn parts(&self) -> (StatusCode, &'static str, Option<Value>) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", None),
            ApiError::Command(err) => {
                let status = match err {
                    ChatError::EmptyCommand
                    | ChatError::CommandTooLong(_)
                    | ChatError::Parse { .. } => StatusCode::BAD_REQUEST,
                    ChatError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
                    ChatError::Handler(_) => StatusCode::NOT_FOUND,
                    ChatError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
                    ChatError::Synthesis { .. }
                    | ChatError::Llm(_)
                    | ChatError::Storage(_)
                    | ChatError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let details = match err {
                    ChatError::Parse { raw, .. } => Some(json!({ "raw": raw })),
                    ChatError::Synthesis { result, .. } => Some(result.clone()),
                    _ => None,
                };
                (status, err.kind(), details)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, details) = self.parts();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Command(err) => err.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%status, kind, error = %message, "Request failed");
        }

        let body = ErrorBody {
            error: message,
            kind: kind.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::Command(err)
    }
}
