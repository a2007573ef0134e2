use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Message returned for any internal failure. The underlying detail is logged only.
pub const GENERIC_INTERNAL_MESSAGE: &str = "An error occurred while processing your request.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(detail) => {
                tracing::error!(kind = %ErrorKind::Infra, "Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    GENERIC_INTERNAL_MESSAGE.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.status_and_message();
        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Plain-text rendering of an [`ApiError`], used by the form endpoint.
#[derive(Debug)]
pub struct PlainTextError(pub ApiError);

impl From<ApiError> for PlainTextError {
    fn from(err: ApiError) -> Self {
        PlainTextError(err)
    }
}

impl IntoResponse for PlainTextError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = self.0.status_and_message();
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

/// Coarse failure classification attached to log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Infra,
    Generation,
    EmptyStore,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Infra => "infra",
            ErrorKind::Generation => "generation",
            ErrorKind::EmptyStore => "empty_store",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_hide_detail() {
        let (status, message) =
            ApiError::internal("sqlite: disk I/O error").status_and_message();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, GENERIC_INTERNAL_MESSAGE);
    }

    #[test]
    fn bad_request_keeps_message() {
        let (status, message) =
            ApiError::BadRequest("Please enter a message.".to_string()).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Please enter a message.");
    }

    #[test]
    fn error_kind_labels_are_snake_case() {
        assert_eq!(ErrorKind::EmptyStore.to_string(), "empty_store");
        assert_eq!(
            serde_json::to_value(ErrorKind::InvalidInput).unwrap(),
            json!("invalid_input")
        );
    }
}
