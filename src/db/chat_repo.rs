// src/db/chat_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        chat::{ChatMessage, ChatRole, ChatSession, ChatStatus},
        pillar::Pillar,
    },
};

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_session<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        pillar: Pillar,
        assessment_id: Option<Uuid>,
    ) -> Result<ChatSession, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = sqlx::query_as::<_, ChatSession>(
            r#"
            INSERT INTO chat_sessions (user_id, pillar, assessment_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(pillar)
        .bind(assessment_id)
        .fetch_one(executor)
        .await?;
        Ok(session)
    }

    // Só o dono vê a própria conversa
    pub async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<ChatSession, AppError> {
        sqlx::query_as::<_, ChatSession>("SELECT * FROM chat_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Conversa"))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ChatSession>, AppError> {
        let rows = sqlx::query_as::<_, ChatSession>(
            "SELECT * FROM chat_sessions WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn set_status(&self, id: Uuid, status: ChatStatus) -> Result<ChatSession, AppError> {
        let session = sqlx::query_as::<_, ChatSession>(
            "UPDATE chat_sessions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn insert_message(&self, session_id: Uuid, role: ChatRole, content: &str) -> Result<ChatMessage, AppError> {
        let message = sqlx::query_as::<_, ChatMessage>(
            r#"
            WITH touched AS (
                UPDATE chat_sessions SET updated_at = NOW() WHERE id = $1
            )
            INSERT INTO chat_messages (chat_session_id, role, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(role)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(message)
    }

    pub async fn list_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, AppError> {
        let rows = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE chat_session_id = $1 ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Últimas `limit` mensagens, por ordem cronológica.
    pub async fn recent_messages(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>, AppError> {
        let mut rows = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT * FROM chat_messages
            WHERE chat_session_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();
        Ok(rows)
    }
}
