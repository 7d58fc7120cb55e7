//! Account storage ports: record tables (`users`, `cvs`, `jobs`) and the blob store.
//!
//! The reconciler, account service and gallery depend on these traits only.
//! `PgRecordStore` and `S3BlobStore` are the production adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::records::{FeedbackRecord, NewFeedbackRecord, NewResumeRecord, ResumeRecord};
use crate::models::user::UserId;

pub mod blob;
pub mod postgres;

pub use blob::S3BlobStore;
pub use postgres::PgRecordStore;

/// Postgres SQLSTATE for unique_violation.
pub const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("storage query failed: {0}")]
    Query(String),

    #[error("blob upload failed: {0}")]
    Blob(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Duplicate(db.message().to_string())
            }
            _ => StoreError::Query(e.to_string()),
        }
    }
}

/// Record storage for users, résumé ("cv") rows and feedback ("job") rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts the `users` row for a freshly created account.
    async fn insert_user(&self, user_id: UserId) -> Result<(), StoreError>;

    /// Résumé records owned by `user_id` named `name`, in storage order.
    async fn find_resumes(&self, user_id: UserId, name: &str)
        -> Result<Vec<ResumeRecord>, StoreError>;

    /// Inserts a résumé record. Returns the new id when the store reports it.
    async fn insert_resume(&self, record: &NewResumeRecord) -> Result<Option<Uuid>, StoreError>;

    /// Inserts a feedback record and returns its id.
    async fn insert_feedback(&self, record: &NewFeedbackRecord) -> Result<Uuid, StoreError>;

    /// Feedback records owned by `user_id`, newest first.
    async fn list_feedback(&self, user_id: UserId) -> Result<Vec<FeedbackRecord>, StoreError>;
}

/// Blob storage for résumé text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `contents` at `path` and returns the reference to keep on the record.
    async fn upload_text(&self, path: &str, contents: &str) -> Result<String, StoreError>;
}

/// Blob path for a résumé: `<user_id>/<percent-encoded resume_name>.txt`.
///
/// Encoding keeps distinct names on distinct keys and keeps `/` out of the name segment.
pub fn resume_blob_path(user_id: UserId, resume_name: &str) -> String {
    format!("{}/{}.txt", user_id, urlencoding::encode(resume_name))
}
