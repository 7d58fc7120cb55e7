use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::records::{FeedbackRecord, NewFeedbackRecord, NewResumeRecord, ResumeRecord};
use crate::models::user::UserId;
use crate::storage::{RecordStore, StoreError};

/// `RecordStore` over the account service's Postgres tables.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_user(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!("Inserted users row for {user_id}");
        Ok(())
    }

    async fn find_resumes(
        &self,
        user_id: UserId,
        name: &str,
    ) -> Result<Vec<ResumeRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ResumeRecord>(
            "SELECT id, user_id, name, cv_storage_id FROM cvs WHERE user_id = $1 AND name = $2",
        )
        .bind(user_id)
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert_resume(&self, record: &NewResumeRecord) -> Result<Option<Uuid>, StoreError> {
        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO cvs (user_id, name, cv_storage_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(record.user_id)
        .bind(&record.name)
        .bind(&record.cv_storage_id)
        .fetch_optional(&self.pool)
        .await?;

        info!("Inserted cvs row '{}' for {}", record.name, record.user_id);
        Ok(id)
    }

    async fn insert_feedback(&self, record: &NewFeedbackRecord) -> Result<Uuid, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO jobs (user_id, job_description, gen_feedback, cv_id, name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(record.user_id)
        .bind(&record.job_description)
        .bind(&record.gen_feedback)
        .bind(record.cv_id)
        .bind(&record.name)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted jobs row {id} for {}", record.user_id);
        Ok(id)
    }

    async fn list_feedback(&self, user_id: UserId) -> Result<Vec<FeedbackRecord>, StoreError> {
        let rows = sqlx::query_as::<_, FeedbackRecord>(
            r#"
            SELECT id, user_id, job_description, gen_feedback, cv_id, name, created_at
            FROM jobs
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
