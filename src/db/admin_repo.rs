// src/db/admin_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    models::admin::{
        AdminLog, AdminLogFilters, CaseFilters, CaseRecord, ChangeRequest,
        ChangeRequestFilters, ChangeRequestStatus, OpenCasePayload, UpdateCasePayload,
    },
};

// Registos administrativos: logs, pedidos de alteração e casos
#[derive(Clone)]
pub struct AdminRepository {
    pool: PgPool,
}

impl AdminRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  ADMIN LOGS
    // =========================================================================

    pub async fn insert_log(
        &self,
        admin_id: Uuid,
        action: &str,
        entity_type: &str,
        entity_id: Option<Uuid>,
        details: &serde_json::Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO admin_logs (admin_id, action, entity_type, entity_id, details) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(admin_id)
        .bind(action)
        .bind(entity_type)
        .bind(entity_id)
        .bind(details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_logs(&self, filters: &AdminLogFilters, page: Pagination) -> Result<Vec<AdminLog>, AppError> {
        let logs = sqlx::query_as::<_, AdminLog>(
            r#"
            SELECT * FROM admin_logs
            WHERE ($1::text IS NULL OR action = $1)
              AND ($2::text IS NULL OR entity_type = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(filters.action.as_deref())
        .bind(filters.entity_type.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    // =========================================================================
    //  PEDIDOS DE ALTERAÇÃO
    // =========================================================================

    pub async fn create_change_request(
        &self,
        prestador_id: Uuid,
        requested_by: Uuid,
        changes: &serde_json::Value,
    ) -> Result<ChangeRequest, AppError> {
        let request = sqlx::query_as::<_, ChangeRequest>(
            r#"
            INSERT INTO change_requests (prestador_id, requested_by, changes)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(prestador_id)
        .bind(requested_by)
        .bind(changes)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    pub async fn list_change_requests(&self, filters: &ChangeRequestFilters) -> Result<Vec<ChangeRequest>, AppError> {
        let rows = sqlx::query_as::<_, ChangeRequest>(
            r#"
            SELECT * FROM change_requests
            WHERE ($1::change_request_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filters.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_change_request_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<ChangeRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ChangeRequest>("SELECT * FROM change_requests WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Pedido de alteração"))
    }

    pub async fn review_change_request<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: ChangeRequestStatus,
        reviewer: Uuid,
        notes: Option<&str>,
    ) -> Result<ChangeRequest, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let request = sqlx::query_as::<_, ChangeRequest>(
            r#"
            UPDATE change_requests
            SET status = $2, reviewed_by = $3, review_notes = $4, reviewed_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reviewer)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(request)
    }

    // =========================================================================
    //  CASOS
    // =========================================================================

    pub async fn open_case(&self, opened_by: Uuid, payload: &OpenCasePayload) -> Result<CaseRecord, AppError> {
        let record = sqlx::query_as::<_, CaseRecord>(
            r#"
            INSERT INTO case_management (user_id, prestador_id, pillar, summary, notes, opened_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(payload.user_id)
        .bind(payload.prestador_id)
        .bind(payload.pillar)
        .bind(&payload.summary)
        .bind(payload.notes.as_deref())
        .bind(opened_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn list_cases(&self, filters: &CaseFilters) -> Result<Vec<CaseRecord>, AppError> {
        let rows = sqlx::query_as::<_, CaseRecord>(
            r#"
            SELECT * FROM case_management
            WHERE ($1::case_status IS NULL OR status = $1)
            ORDER BY updated_at DESC
            "#,
        )
        .bind(filters.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_case(&self, id: Uuid) -> Result<CaseRecord, AppError> {
        sqlx::query_as::<_, CaseRecord>("SELECT * FROM case_management WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Caso"))
    }

    pub async fn update_case(&self, id: Uuid, changes: &UpdateCasePayload) -> Result<CaseRecord, AppError> {
        let record = sqlx::query_as::<_, CaseRecord>(
            r#"
            UPDATE case_management SET
                status       = COALESCE($2, status),
                notes        = COALESCE($3, notes),
                prestador_id = COALESCE($4, prestador_id),
                closed_at    = CASE WHEN $2 = 'closed'::case_status THEN NOW() ELSE closed_at END,
                updated_at   = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.status)
        .bind(changes.notes.as_deref())
        .bind(changes.prestador_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Caso"))?;
        Ok(record)
    }
}
