use async_trait::async_trait;
use sqlx::PgPool;

use crate::db;
use crate::models::{NewSubmission, Submission};

/// Where submission rows land. `Ok(None)` means the insert went through but no row came back.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: &NewSubmission) -> Result<Option<Submission>, sqlx::Error>;
}

pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn insert(&self, submission: &NewSubmission) -> Result<Option<Submission>, sqlx::Error> {
        db::submissions::create(&self.pool, submission).await
    }
}
