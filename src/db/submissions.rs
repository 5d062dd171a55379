use sqlx::PgPool;

use crate::models::{NewSubmission, Submission};

pub async fn create(
    pool: &PgPool,
    submission: &NewSubmission,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(
        "INSERT INTO user_selfies (user_id, user_message, image_url)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(&submission.user_id)
    .bind(&submission.user_message)
    .bind(&submission.image_url)
    .fetch_optional(pool)
    .await
}
