use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ma_core::types::Confirmation;
use ma_core::{ErrorKind, MutualAidError};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub success: bool,
    /// One of the `ErrorKind` names, e.g. `InvalidState`.
    pub error: &'static str,
    pub message: String,
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    pub message: &'static str,
    pub data: T,
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidState | ErrorKind::AlreadyCompleted | ErrorKind::Conflict => {
            StatusCode::CONFLICT
        }
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn map_error(
    err: &MutualAidError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let kind = err.kind();
    let message = if kind == ErrorKind::Internal {
        tracing::error!(correlation_id = ?correlation_id, error = %err, "request failed");
        "something went wrong, please try again".to_string()
    } else {
        err.to_string()
    };

    (
        status_for(kind),
        Json(ErrorEnvelope {
            success: false,
            error: kind.as_str(),
            message,
            correlation_id,
        }),
    )
}

pub fn confirmed<T: Serialize>(confirmation: Confirmation<T>) -> Response {
    ok(confirmation.message, confirmation.data)
}

pub fn ok<T: Serialize>(message: &'static str, data: T) -> Response {
    Json(SuccessEnvelope {
        success: true,
        message,
        data,
    })
    .into_response()
}

/// Malformed JSON bodies, including malformed ids inside them, report `InvalidInput` in the usual envelope.
pub fn json_rejection(rejection: &JsonRejection, correlation_id: Option<String>) -> Response {
    map_error(
        &MutualAidError::invalid_input(rejection.body_text()),
        correlation_id,
    )
    .into_response()
}

pub fn query_rejection(rejection: &QueryRejection, correlation_id: Option<String>) -> Response {
    map_error(
        &MutualAidError::invalid_input(rejection.body_text()),
        correlation_id,
    )
    .into_response()
}
