use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::UserId;

/// Row of the `cvs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResumeRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    pub cv_storage_id: String,
}

/// Row of the `jobs` table. `gen_feedback` holds the serialized report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub job_description: String,
    pub gen_feedback: Option<String>,
    pub cv_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewResumeRecord {
    pub user_id: UserId,
    pub name: String,
    pub cv_storage_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedbackRecord {
    pub user_id: UserId,
    pub job_description: String,
    pub gen_feedback: String,
    pub cv_id: Uuid,
    pub name: String,
}
