//! Axum route handlers for the analysis, save, feedback and account endpoints.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::analysis::{ResumeFile, SubmissionInput};
use crate::models::user::{AuthUser, UserId};
use crate::state::AppState;
use crate::workflow::controller::WorkflowState;
use crate::workflow::gallery::SavedFeedback;
use crate::workflow::presentation::{render, ViewModel};
use crate::workflow::reconciler::Ack;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub state: WorkflowState,
    pub message: Option<String>,
    pub view: ViewModel,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub message: String,
    pub ack: Ack,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<AuthUser>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/analyze
///
/// Multipart form with `job_description` and `cv_file`. Runs the submission
/// and returns the rendered result card.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut input = read_submission(multipart).await?;
    let submitted_job_description = input.job_description.clone();

    let report = state.submissions.submit(&mut input).await?;

    Ok(Json(AnalyzeResponse {
        state: state.submissions.state(),
        message: state.submissions.last_message(),
        view: render(&report, &submitted_job_description),
    }))
}

/// POST /api/feedback
///
/// Saves the pending analysis under the given label for the signed-in user.
/// An analysis submitted while the save was running stays pending.
pub async fn handle_save_feedback(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let current_user = state.accounts.current_user_id().await;
    let pending = state.submissions.pending();

    let ack = state
        .reconciler
        .save(pending.as_ref(), request.label.trim(), current_user)
        .await?;
    if let Some(saved) = &pending {
        state.submissions.clear_pending_if(saved);
    }

    Ok(Json(SaveResponse {
        message: "Feedback saved".to_string(),
        ack,
    }))
}

/// GET /api/feedback
pub async fn handle_list_feedback(
    State(state): State<AppState>,
) -> Result<Json<Vec<SavedFeedback>>, AppError> {
    let current_user = state.accounts.current_user_id().await;
    Ok(Json(state.gallery.list_saved(current_user).await?))
}

/// POST /api/auth/signup
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .accounts
        .sign_up(&request.email, &request.password)
        .await?;

    Ok(Json(AuthResponse {
        message: "Account created successfully".to_string(),
        user_id: user.id,
    }))
}

/// POST /api/auth/signin
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .accounts
        .sign_in(&request.email, &request.password)
        .await?;

    let email = user.email.as_deref().unwrap_or(&request.email);
    Ok(Json(AuthResponse {
        message: format!("Logged in as {email}"),
        user_id: user.id,
    }))
}

/// POST /api/auth/signout
pub async fn handle_sign_out(State(state): State<AppState>) -> StatusCode {
    state.accounts.sign_out().await;
    StatusCode::NO_CONTENT
}

/// GET /api/auth/session
pub async fn handle_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: state.accounts.current_user().await,
    })
}

/// Reads the upload form. An empty file part (no file chosen) counts as no file.
async fn read_submission(mut multipart: Multipart) -> Result<SubmissionInput, AppError> {
    let mut input = SubmissionInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_description" => {
                input.job_description = field.text().await?;
            }
            "cv_file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                if !file_name.is_empty() || !bytes.is_empty() {
                    input.file = Some(ResumeFile::new(file_name, bytes));
                }
            }
            _ => {}
        }
    }

    Ok(input)
}
