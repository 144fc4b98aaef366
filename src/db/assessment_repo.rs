// src/db/assessment_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        assessment::{Assessment, AssessmentOutcome},
        pillar::Pillar,
    },
};

#[derive(Clone)]
pub struct AssessmentRepository {
    pool: PgPool,
}

impl AssessmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create_assessment<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        pillar: Pillar,
        answers: &serde_json::Value,
        score: i32,
        max_score: i32,
        outcome: AssessmentOutcome,
    ) -> Result<Assessment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let assessment = sqlx::query_as::<_, Assessment>(
            r#"
            INSERT INTO assessments (user_id, pillar, answers, score, max_score, outcome)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(pillar)
        .bind(answers)
        .bind(score)
        .bind(max_score)
        .bind(outcome)
        .fetch_one(executor)
        .await?;
        Ok(assessment)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Assessment>, AppError> {
        let rows = sqlx::query_as::<_, Assessment>(
            "SELECT * FROM assessments WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Assessment, AppError> {
        sqlx::query_as::<_, Assessment>("SELECT * FROM assessments WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Avaliação"))
    }
}
