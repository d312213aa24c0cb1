use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            // Retryable: the only condition callers should blindly retry.
            AppError::Database(_) => error_resp(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::DatabaseError,
                None,
            ),
            AppError::MissingReference => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::MissingReference, None)
            }
            AppError::MissingRecipient => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::MissingRecipient, None)
            }
            AppError::PaymentNotVerified(msg) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::PaymentNotVerified,
                Some(msg),
            ),
            AppError::UnknownPlan(plan) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::UnknownPlan,
                Some(format!("Unknown plan: {plan}")),
            ),
            AppError::InvalidGrant(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InvalidGrant,
                None,
            ),
            AppError::RecipientNotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::RecipientNotFound, None)
            }
            AppError::ProviderNotConfigured => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::ProviderNotConfigured,
                None,
            ),
            AppError::ProviderNotSupported => error_resp(
                StatusCode::FORBIDDEN,
                ErrorCode::ProviderNotSupported,
                None,
            ),
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                None,
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
