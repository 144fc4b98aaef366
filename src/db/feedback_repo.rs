// src/db/feedback_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{map_unique_violation, Pagination},
        error::AppError,
    },
    models::booking::{Booking, Feedback, FeedbackFilters, FeedbackPayload},
};

#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_feedback<'e, E>(
        &self,
        executor: E,
        booking: &Booking,
        payload: &FeedbackPayload,
    ) -> Result<Feedback, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (booking_id, user_id, prestador_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.prestador_id)
        .bind(payload.rating)
        .bind(payload.comment.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                AppError::UniqueConstraintViolation("Esta sessão já foi avaliada.".into()),
            )
        })
    }

    pub async fn list(&self, filters: &FeedbackFilters, page: Pagination) -> Result<Vec<Feedback>, AppError> {
        let rows = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT * FROM feedback
            WHERE ($1::uuid IS NULL OR prestador_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filters.prestador_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn for_prestador(&self, prestador_id: Uuid) -> Result<Vec<Feedback>, AppError> {
        self.list(&FeedbackFilters { prestador_id: Some(prestador_id) }, Pagination::default())
            .await
    }
}
