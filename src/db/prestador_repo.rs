// src/db/prestador_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::map_unique_violation, error::AppError},
    models::{
        pillar::Pillar,
        prestador::{Prestador, PrestadorFilters, UpdatePrestadorPayload},
    },
};

pub struct NewPrestador<'a> {
    pub profile_id: Option<Uuid>,
    pub full_name: &'a str,
    pub email: &'a str,
    pub pillars: &'a [Pillar],
    pub specialties: &'a [String],
    pub license_number: Option<&'a str>,
    pub bio: Option<&'a str>,
}

#[derive(Clone)]
pub struct PrestadorRepository {
    pool: PgPool,
}

impl PrestadorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_prestador<'e, E>(&self, executor: E, new: NewPrestador<'_>) -> Result<Prestador, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Prestador>(
            r#"
            INSERT INTO prestadores (profile_id, full_name, email, pillars, specialties, license_number, bio)
            VALUES ($1, $2, lower($3), $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(new.profile_id)
        .bind(new.full_name)
        .bind(new.email)
        .bind(new.pillars)
        .bind(new.specialties)
        .bind(new.license_number)
        .bind(new.bio)
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, AppError::EmailAlreadyExists))
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Prestador, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Prestador>("SELECT * FROM prestadores WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Prestador"))
    }

    pub async fn find_by_profile_id(&self, profile_id: Uuid) -> Result<Prestador, AppError> {
        sqlx::query_as::<_, Prestador>("SELECT * FROM prestadores WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Prestador"))
    }

    pub async fn list(&self, filters: &PrestadorFilters) -> Result<Vec<Prestador>, AppError> {
        let prestadores = sqlx::query_as::<_, Prestador>(
            r#"
            SELECT * FROM prestadores
            WHERE ($1::pillar IS NULL OR $1 = ANY(pillars))
              AND ($2::boolean IS NULL OR is_active = $2)
            ORDER BY full_name
            "#,
        )
        .bind(filters.pillar)
        .bind(filters.active)
        .fetch_all(&self.pool)
        .await?;
        Ok(prestadores)
    }

    pub async fn update_prestador<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &UpdatePrestadorPayload,
    ) -> Result<Prestador, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Prestador>(
            r#"
            UPDATE prestadores SET
                full_name      = COALESCE($2, full_name),
                pillars        = COALESCE($3, pillars),
                specialties    = COALESCE($4, specialties),
                license_number = COALESCE($5, license_number),
                bio            = COALESCE($6, bio),
                updated_at     = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(changes.full_name.as_deref())
        .bind(changes.pillars.as_deref())
        .bind(changes.specialties.as_deref())
        .bind(changes.license_number.as_deref())
        .bind(changes.bio.as_deref())
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Prestador"))
    }

    pub async fn set_active<'e, E>(&self, executor: E, id: Uuid, is_active: bool) -> Result<Prestador, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Prestador>(
            "UPDATE prestadores SET is_active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_active)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Prestador"))
    }
}
