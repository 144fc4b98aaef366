// src/db/company_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::like_pattern, error::AppError},
    models::company::{Company, CompanyFilters, CreateCompanyPayload, UpdateCompanyPayload},
};

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_company<'e, E>(&self, executor: E, payload: &CreateCompanyPayload) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, contact_email, contact_phone, plan_type, sessions_allocated)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(&payload.contact_email)
        .bind(payload.contact_phone.as_deref())
        .bind(&payload.plan_type)
        .bind(payload.sessions_allocated)
        .fetch_one(executor)
        .await?;
        Ok(company)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Empresa"))
    }

    // Bloqueia a linha até ao fim da transação
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Empresa"))
    }

    pub async fn list(&self, filters: &CompanyFilters) -> Result<Vec<Company>, AppError> {
        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT * FROM companies
            WHERE ($1::text IS NULL OR name ILIKE $1 OR contact_email ILIKE $1)
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY name
            "#,
        )
        .bind(like_pattern(filters.search.as_deref()))
        .bind(filters.active)
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    pub async fn update_company<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &UpdateCompanyPayload,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name               = COALESCE($2, name),
                contact_email      = COALESCE($3, contact_email),
                contact_phone      = COALESCE($4, contact_phone),
                plan_type          = COALESCE($5, plan_type),
                sessions_allocated = COALESCE($6, sessions_allocated),
                updated_at         = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.contact_email.as_deref())
        .bind(changes.contact_phone.as_deref())
        .bind(changes.plan_type.as_deref())
        .bind(changes.sessions_allocated)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Empresa"))
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, is_active: bool) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            "UPDATE companies SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Empresa"))
    }

    pub async fn add_sessions<'e, E>(&self, executor: E, id: Uuid, amount: i32) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET sessions_allocated = sessions_allocated + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Empresa"))
    }

    /// Soma `delta` (positivo ou negativo) às sessões consumidas, sem descer abaixo de zero.
    pub async fn adjust_sessions_used<'e, E>(&self, executor: E, id: Uuid, delta: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE companies
            SET sessions_used = GREATEST(sessions_used + $2, 0), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Sessões já atribuídas a colaboradores (alocações `company` ativas).
    pub async fn committed_sessions<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        excluding_user: Option<Uuid>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(sessions_allocated), 0)::bigint
            FROM session_allocations
            WHERE company_id = $1
              AND allocation_type = 'company'
              AND is_active
              AND ($2::uuid IS NULL OR user_id <> $2)
            "#,
        )
        .bind(company_id)
        .bind(excluding_user)
        .fetch_one(executor)
        .await?;
        Ok(total)
    }
}
