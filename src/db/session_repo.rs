// src/db/session_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sessions::{AllocationType, SessionAllocation, SessionUsage},
};

pub struct NewAllocation<'a> {
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub allocation_type: AllocationType,
    pub sessions_allocated: i32,
    pub sessions_used: i32,
    pub previous_allocation_id: Option<Uuid>,
    pub reason: &'a str,
    pub created_by: Option<Uuid>,
}

// Livro de alocações (append/deactivate) e registos de consumo
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn active_allocations<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<SessionAllocation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, SessionAllocation>(
            "SELECT * FROM session_allocations WHERE user_id = $1 AND is_active ORDER BY allocation_type",
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Serializa as alterações ao livro de um utilizador até ao fim da transação.
    /// Tem de ser por utilizador: cada ajuste troca a linha ativa por uma nova.
    pub async fn lock_user_ledger(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Alocações ativas lidas depois de obter o lock do livro (usar dentro de transação).
    pub async fn lock_active_allocations(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<SessionAllocation>, AppError> {
        self.lock_user_ledger(&mut *conn, user_id).await?;
        self.active_allocations(&mut *conn, user_id).await
    }

    pub async fn active_allocations_for_users(&self, user_ids: &[Uuid]) -> Result<Vec<SessionAllocation>, AppError> {
        let rows = sqlx::query_as::<_, SessionAllocation>(
            "SELECT * FROM session_allocations WHERE user_id = ANY($1) AND is_active",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // Histórico completo, mais recente primeiro
    pub async fn allocation_history(&self, user_id: Uuid) -> Result<Vec<SessionAllocation>, AppError> {
        let rows = sqlx::query_as::<_, SessionAllocation>(
            "SELECT * FROM session_allocations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn deactivate<'e, E>(&self, executor: E, allocation_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE session_allocations SET is_active = FALSE, deactivated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(allocation_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn insert_allocation<'e, E>(&self, executor: E, new: NewAllocation<'_>) -> Result<SessionAllocation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, SessionAllocation>(
            r#"
            INSERT INTO session_allocations (
                user_id, company_id, allocation_type, sessions_allocated, sessions_used,
                previous_allocation_id, reason, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.company_id)
        .bind(new.allocation_type)
        .bind(new.sessions_allocated)
        .bind(new.sessions_used)
        .bind(new.previous_allocation_id)
        .bind(new.reason)
        .bind(new.created_by)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    pub async fn insert_usage<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        allocation: &SessionAllocation,
    ) -> Result<SessionUsage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let usage = sqlx::query_as::<_, SessionUsage>(
            r#"
            INSERT INTO session_usages (booking_id, user_id, allocation_id, allocation_type, company_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(allocation.user_id)
        .bind(allocation.id)
        .bind(allocation.allocation_type)
        .bind(allocation.company_id)
        .fetch_one(executor)
        .await?;
        Ok(usage)
    }

    pub async fn find_usage_for_update<'e, E>(&self, executor: E, usage_id: Uuid) -> Result<SessionUsage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SessionUsage>("SELECT * FROM session_usages WHERE id = $1 FOR UPDATE")
            .bind(usage_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Registo de sessão"))
    }

    pub async fn mark_usage_refunded<'e, E>(&self, executor: E, usage_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE session_usages SET refunded_at = NOW() WHERE id = $1 AND refunded_at IS NULL")
            .bind(usage_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
