//! Submission workflow controller.
//!
//! `Idle → Validating → Uploading → Succeeded | Failed`. One submission may be
//! in flight at a time; a second `submit` while one is outstanding is rejected
//! with `ConcurrentSubmission`. The in-flight state is always settled, even
//! when the submitting future is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::gateway::{AnalysisGateway, GatewayError};
use crate::models::analysis::{AnalysisReport, PendingAnalysis, ResumeFile, SubmissionInput};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    Validating,
    Uploading,
    Succeeded,
    Failed,
}

impl WorkflowState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, WorkflowState::Validating | WorkflowState::Uploading)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmissionError {
    #[error("Please attach a CV file.")]
    MissingFile,

    #[error("Unsupported file type for '{file_name}'. Please attach a .pdf, .doc or .docx file.")]
    UnsupportedFileType { file_name: String },

    #[error("Please paste a job description.")]
    MissingJobDescription,

    #[error("A submission is already in progress.")]
    ConcurrentSubmission,

    #[error("{message}")]
    GatewayRejected { status: u16, message: String },

    #[error("{cause}")]
    TransportError { cause: String },
}

impl SubmissionError {
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SubmissionError::MissingFile
                | SubmissionError::UnsupportedFileType { .. }
                | SubmissionError::MissingJobDescription
        )
    }
}

impl From<GatewayError> for SubmissionError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Rejected { status, message } => {
                SubmissionError::GatewayRejected { status, message }
            }
            GatewayError::Transport(cause) => SubmissionError::TransportError { cause },
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: WorkflowState,
    pending: Option<PendingAnalysis>,
    last_message: Option<String>,
}

/// Drives a submission against the analysis gateway and holds its result.
pub struct SubmissionController {
    gateway: Arc<dyn AnalysisGateway>,
    inner: Mutex<Inner>,
}

impl SubmissionController {
    pub fn new(gateway: Arc<dyn AnalysisGateway>) -> Self {
        Self {
            gateway,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.lock().state
    }

    /// The analysis awaiting a save, if the last submission succeeded.
    pub fn pending(&self) -> Option<PendingAnalysis> {
        self.lock().pending.clone()
    }

    /// Clears the pending analysis only if it is still `saved`.
    ///
    /// A newer analysis that landed while `saved` was being persisted is kept.
    pub fn clear_pending_if(&self, saved: &PendingAnalysis) -> bool {
        let mut inner = self.lock();
        if inner.pending.as_ref() == Some(saved) {
            inner.pending = None;
            true
        } else {
            false
        }
    }

    /// Status message sent by the gateway with the last successful analysis.
    pub fn last_message(&self) -> Option<String> {
        self.lock().last_message.clone()
    }

    /// Validates the form, posts it to the gateway and returns the normalized report.
    ///
    /// The form is cleared only on success. Validation failures never reach the gateway.
    pub async fn submit(
        &self,
        input: &mut SubmissionInput,
    ) -> Result<AnalysisReport, SubmissionError> {
        let flight = self.begin()?;

        let outcome = self.run(input).await;
        match &outcome {
            Ok(report) => {
                info!("Submission succeeded (match score {})", report.match_score);
                flight.settle(WorkflowState::Succeeded);
            }
            Err(e) => {
                warn!("Submission failed: {e}");
                flight.settle(WorkflowState::Failed);
            }
        }
        outcome
    }

    fn begin(&self) -> Result<Flight<'_>, SubmissionError> {
        let mut inner = self.lock();
        if inner.state.is_in_flight() {
            return Err(SubmissionError::ConcurrentSubmission);
        }
        inner.state = WorkflowState::Validating;
        Ok(Flight {
            inner: &self.inner,
            settled: false,
        })
    }

    async fn run(&self, input: &mut SubmissionInput) -> Result<AnalysisReport, SubmissionError> {
        let file = validate(input)?;
        let job_description = input.job_description.trim();

        {
            let mut inner = self.lock();
            inner.state = WorkflowState::Uploading;
            inner.pending = None;
            inner.last_message = None;
        }
        info!(
            "Uploading '{}' ({} bytes) for analysis",
            file.file_name,
            file.bytes.len()
        );

        let reply = self.gateway.analyze(job_description, file).await?;

        let report = reply.report;
        let pending = PendingAnalysis {
            resume_text: reply.resume_text,
            job_description_text: reply
                .job_description
                .or_else(|| Some(job_description.to_string())),
            feedback: Some(report.clone()),
            resume_name: reply.cv_name.or_else(|| Some(file.file_name.clone())),
        };

        {
            let mut inner = self.lock();
            inner.pending = Some(pending);
            inner.last_message = reply.message;
        }

        input.clear();
        Ok(report)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Checks the form before anything leaves the client. The file check comes first.
fn validate(input: &SubmissionInput) -> Result<&ResumeFile, SubmissionError> {
    let file = input.file.as_ref().ok_or(SubmissionError::MissingFile)?;
    if file.kind().is_none() {
        return Err(SubmissionError::UnsupportedFileType {
            file_name: file.file_name.clone(),
        });
    }
    if input.job_description.trim().is_empty() {
        return Err(SubmissionError::MissingJobDescription);
    }
    Ok(file)
}

/// Marks a submission in flight; lands in `Failed` unless settled explicitly.
struct Flight<'a> {
    inner: &'a Mutex<Inner>,
    settled: bool,
}

impl Flight<'_> {
    fn settle(mut self, state: WorkflowState) {
        self.set(state);
        self.settled = true;
    }

    fn set(&self, state: WorkflowState) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state = state;
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.set(WorkflowState::Failed);
        }
    }
}
