use std::any::Any;
use std::backtrace::Backtrace;
use std::panic;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::documents::DocumentError;
use crate::graphql::GraphQLError;
use crate::mail::MailError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Human-readable error description.
    #[schema(example = "invalid or expired token")]
    pub error: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    Unregistered,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::TokenMissing => (
                StatusCode::BAD_REQUEST,
                "missing or malformed token".to_string(),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "invalid or expired token".to_string(),
            ),
            AppError::Unregistered => (StatusCode::UNAUTHORIZED, "unregistered user".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        if !status.is_server_error() {
            tracing::info!(status = status.as_u16(), error = %message, "request rejected");
        }

        (status, ErrorBody { error: message })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<GraphQLError> for AppError {
    fn from(err: GraphQLError) -> Self {
        match err {
            GraphQLError::Query(messages) => AppError::Validation(messages.join("; ")),
            other => AppError::Internal(format!("failed to communicate with the database: {other}")),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Unsupported(mime) => {
                tracing::debug!(%mime, "rejected document type");
                AppError::Validation("unsupported file type".into())
            }
            DocumentError::Empty | DocumentError::NotUtf8 => AppError::Validation(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::Internal(format!("failed to send email: {err}"))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Turns a handler panic into the regular 500 envelope. The payload is only logged.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic_message(payload.as_ref());
    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}

/// Log every panic with its location and a backtrace, while the stack is still intact.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        tracing::error!(
            panic = %panic_message(info.payload()),
            location = %info.location().map(ToString::to_string).unwrap_or_default(),
            %backtrace,
            "panic"
        );
    }));
}
