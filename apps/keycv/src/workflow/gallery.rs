//! Saved feedback listing for the signed-in user.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::gateway::normalize::normalize_stored_report;
use crate::models::user::UserId;
use crate::storage::RecordStore;
use crate::workflow::presentation::{render, ViewModel};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GalleryError {
    #[error("You must log in to view saved feedback")]
    NotAuthenticated,

    #[error("There has been an error while retrieving feedback records")]
    Retrieval(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedFeedback {
    pub id: Uuid,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub view: ViewModel,
}

pub struct FeedbackGallery {
    records: Arc<dyn RecordStore>,
}

impl FeedbackGallery {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Newest first. Corrupt stored feedback renders as an empty report.
    pub async fn list_saved(
        &self,
        current_user: Option<UserId>,
    ) -> Result<Vec<SavedFeedback>, GalleryError> {
        let user_id = current_user.ok_or(GalleryError::NotAuthenticated)?;

        let rows = self.records.list_feedback(user_id).await.map_err(|e| {
            warn!("Could not list feedback for {user_id}: {e}");
            GalleryError::Retrieval(e.to_string())
        })?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let report = normalize_stored_report(row.gen_feedback.as_deref());
                SavedFeedback {
                    id: row.id,
                    label: row.name,
                    created_at: row.created_at,
                    view: render(&report, &row.job_description),
                }
            })
            .collect())
    }
}
