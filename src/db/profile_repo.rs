// src/db/profile_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{like_pattern, map_unique_violation, Pagination},
        error::AppError,
    },
    models::{
        auth::{Profile, UserRole},
        users::{UpdateUserPayload, UserFilters},
    },
};

// Dados para inserir um perfil (a senha já vem com hash)
pub struct NewProfile<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: &'a str,
    pub role: UserRole,
    pub company_id: Option<Uuid>,
    pub department: Option<&'a str>,
    pub job_title: Option<&'a str>,
}

// O repositório de perfis, responsável por todas as interações com a tabela 'profiles'
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um perfil pelo e-mail (sem distinguir maiúsculas)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(profile)
    }

    pub async fn email_exists<'e, E>(&self, executor: E, email: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM profiles WHERE lower(email) = lower($1))",
        )
        .bind(email)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn create_profile<'e, E>(&self, executor: E, new: NewProfile<'_>) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (email, password_hash, full_name, role, company_id, department, job_title)
            VALUES (lower($1), $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.full_name)
        .bind(new.role)
        .bind(new.company_id)
        .bind(new.department)
        .bind(new.job_title)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, AppError::EmailAlreadyExists))
    }

    pub async fn list(&self, filters: &UserFilters, page: Pagination) -> Result<Vec<Profile>, AppError> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT * FROM profiles
            WHERE ($1::user_role IS NULL OR role = $1)
              AND ($2::uuid IS NULL OR company_id = $2)
              AND ($3::text IS NULL OR full_name ILIKE $3 OR email ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filters.role)
        .bind(filters.company_id)
        .bind(like_pattern(filters.search.as_deref()))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    // Colaboradores (perfil `user`) de uma empresa
    pub async fn list_company_employees(
        &self,
        company_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Profile>, AppError> {
        let profiles = sqlx::query_as::<_, Profile>(
            r#"
            SELECT * FROM profiles
            WHERE company_id = $1
              AND role = 'user'
              AND ($2::text IS NULL OR full_name ILIKE $2 OR email ILIKE $2)
            ORDER BY full_name
            "#,
        )
        .bind(company_id)
        .bind(like_pattern(search))
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    pub async fn update_profile<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &UpdateUserPayload,
    ) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET
                full_name  = COALESCE($2, full_name),
                role       = COALESCE($3, role),
                company_id = COALESCE($4, company_id),
                department = COALESCE($5, department),
                job_title  = COALESCE($6, job_title),
                is_active  = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.full_name.as_deref())
        .bind(changes.role)
        .bind(changes.company_id)
        .bind(changes.department.as_deref())
        .bind(changes.job_title.as_deref())
        .bind(changes.is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Utilizador"))
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, is_active: bool) -> Result<Profile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Utilizador"))
    }

    /// Ativa/desativa em massa os perfis da empresa (os admins ficam de fora).
    pub async fn set_company_profiles_active<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        is_active: bool,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET is_active = $2, updated_at = NOW()
            WHERE company_id = $1 AND role <> 'admin' AND is_active <> $2
            "#,
        )
        .bind(company_id)
        .bind(is_active)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
