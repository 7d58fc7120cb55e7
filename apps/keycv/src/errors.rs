use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::workflow::accounts::AccountError;
use crate::workflow::controller::SubmissionError;
use crate::workflow::gallery::GalleryError;
use crate::workflow::reconciler::SaveError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Gallery(#[from] GalleryError),

    /// Unreadable upload form; the status comes from the multipart layer.
    #[error(transparent)]
    Upload(#[from] MultipartError),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Submission(e) => match e {
                e if e.is_validation() => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                SubmissionError::ConcurrentSubmission => {
                    (StatusCode::CONFLICT, "CONCURRENT_SUBMISSION", e.to_string())
                }
                SubmissionError::GatewayRejected { .. } => {
                    (StatusCode::BAD_GATEWAY, "GATEWAY_REJECTED", e.to_string())
                }
                _ => (
                    StatusCode::BAD_GATEWAY,
                    "GATEWAY_UNAVAILABLE",
                    e.to_string(),
                ),
            },
            AppError::Save(e) => match e {
                SaveError::NotAuthenticated => {
                    (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED", e.to_string())
                }
                SaveError::IncompleteAnalysis => {
                    (StatusCode::CONFLICT, "INCOMPLETE_ANALYSIS", e.to_string())
                }
                SaveError::DuplicateResume { .. } => {
                    tracing::error!("Save error: {e}");
                    (StatusCode::BAD_GATEWAY, "DUPLICATE_RESUME", e.to_string())
                }
                SaveError::LookupError(_)
                | SaveError::BlobUploadError(_)
                | SaveError::RecordInsertError(_) => {
                    tracing::error!("Save error: {e}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "SAVE_FAILED",
                        "Your feedback could not be saved. Please try again.".to_string(),
                    )
                }
            },
            AppError::Account(e) => match e {
                AccountError::MissingCredentials | AccountError::PasswordTooShort => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
                }
                AccountError::EmailInUse => (StatusCode::CONFLICT, "EMAIL_IN_USE", e.to_string()),
                AccountError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
                }
                AccountError::AccountCreationFailed | AccountError::SignInFailed => {
                    (StatusCode::BAD_GATEWAY, "ACCOUNT_ERROR", e.to_string())
                }
            },
            AppError::Gallery(e) => match e {
                GalleryError::NotAuthenticated => {
                    (StatusCode::UNAUTHORIZED, "NOT_AUTHENTICATED", e.to_string())
                }
                GalleryError::Retrieval(detail) => {
                    tracing::error!("Gallery error: {detail}");
                    (StatusCode::BAD_GATEWAY, "RETRIEVAL_FAILED", e.to_string())
                }
            },
            AppError::Upload(e) => match e.status() {
                StatusCode::PAYLOAD_TOO_LARGE => (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "UPLOAD_TOO_LARGE",
                    "The uploaded CV is too large.".to_string(),
                ),
                status => (status, "INVALID_UPLOAD", e.body_text()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
