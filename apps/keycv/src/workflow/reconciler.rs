//! Persistence reconciler: saves a pending analysis as a cv record plus a job record.
//!
//! Sequence: lookup cv by (owner, name) → upload blob + insert cv if absent →
//! insert job. Every call completes before the next starts. Not transactional:
//! a failure after the cv insert leaves that cv record behind without a job.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::analysis::{CompleteAnalysis, PendingAnalysis};
use crate::models::records::{NewFeedbackRecord, NewResumeRecord};
use crate::models::user::UserId;
use crate::storage::{resume_blob_path, BlobStore, RecordStore, StoreError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SaveError {
    #[error("You must be logged in to save feedback.")]
    NotAuthenticated,

    #[error("There is no complete analysis to save. Submit your CV first.")]
    IncompleteAnalysis,

    #[error("Could not look up your saved CVs: {0}")]
    LookupError(String),

    #[error("Could not upload your CV: {0}")]
    BlobUploadError(String),

    #[error("Could not save your feedback: {0}")]
    RecordInsertError(String),

    #[error("A CV named '{name}' already exists but could not be retrieved.")]
    DuplicateResume { name: String },
}

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
    pub feedback_id: Uuid,
    pub resume_record_id: Uuid,
    /// True when an existing cv record was linked instead of a new one created.
    pub reused_resume: bool,
}

pub struct PersistenceReconciler {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
}

impl PersistenceReconciler {
    pub fn new(records: Arc<dyn RecordStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { records, blobs }
    }

    /// Persists `pending` under `label` for `current_user`.
    ///
    /// Authentication is checked before the analysis is inspected.
    pub async fn save(
        &self,
        pending: Option<&PendingAnalysis>,
        label: &str,
        current_user: Option<UserId>,
    ) -> Result<Ack, SaveError> {
        let user_id = current_user.ok_or(SaveError::NotAuthenticated)?;
        let analysis = pending
            .and_then(PendingAnalysis::complete)
            .ok_or(SaveError::IncompleteAnalysis)?;

        let (resume_record_id, reused_resume) = self.resolve_resume(user_id, &analysis).await?;

        let gen_feedback = serde_json::to_string(analysis.feedback)
            .map_err(|e| SaveError::RecordInsertError(e.to_string()))?;
        let feedback_id = self
            .records
            .insert_feedback(&NewFeedbackRecord {
                user_id,
                job_description: analysis.job_description_text.to_string(),
                gen_feedback,
                cv_id: resume_record_id,
                name: label.to_string(),
            })
            .await
            .map_err(|e| SaveError::RecordInsertError(e.to_string()))?;

        info!(
            "Saved feedback {feedback_id} ('{label}') for {user_id} against cv {resume_record_id}"
        );

        Ok(Ack {
            feedback_id,
            resume_record_id,
            reused_resume,
        })
    }

    /// Returns the cv record id to link, and whether it already existed.
    async fn resolve_resume(
        &self,
        user_id: UserId,
        analysis: &CompleteAnalysis<'_>,
    ) -> Result<(Uuid, bool), SaveError> {
        let name = analysis.resume_name;

        if let Some(id) = self.lookup(user_id, name).await? {
            info!("Reusing cv record {id} ('{name}') for {user_id}");
            return Ok((id, true));
        }

        let path = resume_blob_path(user_id, name);
        let cv_storage_id = self
            .blobs
            .upload_text(&path, analysis.resume_text)
            .await
            .map_err(|e| SaveError::BlobUploadError(e.to_string()))?;

        let record = NewResumeRecord {
            user_id,
            name: name.to_string(),
            cv_storage_id,
        };

        match self.records.insert_resume(&record).await {
            Ok(Some(id)) => Ok((id, false)),
            Ok(None) => self
                .lookup(user_id, name)
                .await?
                .map(|id| (id, false))
                .ok_or_else(|| {
                    SaveError::RecordInsertError(format!(
                        "cv record '{name}' was inserted but could not be re-fetched"
                    ))
                }),
            Err(StoreError::Duplicate(message)) => {
                warn!("cv record '{name}' already exists ({message}); looking it up again");
                match self.lookup(user_id, name).await? {
                    Some(id) => Ok((id, true)),
                    None => Err(SaveError::DuplicateResume {
                        name: name.to_string(),
                    }),
                }
            }
            Err(e) => Err(SaveError::RecordInsertError(e.to_string())),
        }
    }

    /// First record returned by the store wins.
    async fn lookup(&self, user_id: UserId, name: &str) -> Result<Option<Uuid>, SaveError> {
        let records = self
            .records
            .find_resumes(user_id, name)
            .await
            .map_err(|e| SaveError::LookupError(e.to_string()))?;
        Ok(records.first().map(|r| r.id))
    }
}
