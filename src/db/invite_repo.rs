// src/db/invite_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::invite::{CreateInvitePayload, Invite, InviteFilters, InvitePreview, InviteStatus},
};

const PENDING_EMAIL_CONSTRAINT: &str = "uq_invites_pending_email";
const INVITE_CODE_CONSTRAINT: &str = "invites_invite_code_key";

#[derive(Clone)]
pub struct InviteRepository {
    pool: PgPool,
}

impl InviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Devolve `Ok(None)` quando o código gerado já existe (quem chama tenta outro).
    pub async fn create_invite<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        invited_by: Uuid,
        payload: &CreateInvitePayload,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<Invite>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query_as::<_, Invite>(
            r#"
            INSERT INTO invites (
                company_id, email, invite_code, full_name, department, job_title,
                sessions_allocated, invited_by, expires_at
            )
            VALUES ($1, lower($2), $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(&payload.email)
        .bind(code)
        .bind(payload.full_name.as_deref())
        .bind(payload.department.as_deref())
        .bind(payload.job_title.as_deref())
        .bind(payload.sessions_allocated)
        .bind(invited_by)
        .bind(expires_at)
        .fetch_one(executor)
        .await;

        match result {
            Ok(invite) => Ok(Some(invite)),
            Err(e) => {
                let constraint = e
                    .as_database_error()
                    .filter(|db_err| db_err.is_unique_violation())
                    .and_then(|db_err| db_err.constraint().map(str::to_owned));
                match constraint.as_deref() {
                    Some(PENDING_EMAIL_CONSTRAINT) => Err(AppError::DuplicateInvite(payload.email.clone())),
                    Some(INVITE_CODE_CONSTRAINT) => Ok(None),
                    _ => Err(e.into()),
                }
            }
        }
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Invite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Convite"))
    }

    pub async fn find_by_code_for_update<'e, E>(&self, executor: E, code: &str) -> Result<Invite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE invite_code = upper($1) FOR UPDATE")
            .bind(code.trim())
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::InviteInvalid)
    }

    pub async fn preview_by_code(&self, code: &str) -> Result<InvitePreview, AppError> {
        let row = sqlx::query_as::<_, (String, Option<String>, String, InviteStatus, DateTime<Utc>)>(
            r#"
            SELECT i.email, i.full_name, c.name, i.status, i.expires_at
            FROM invites i
            JOIN companies c ON c.id = i.company_id
            WHERE i.invite_code = upper($1)
            "#,
        )
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::InviteInvalid)?;

        Ok(InvitePreview {
            email: row.0,
            full_name: row.1,
            company_name: row.2,
            status: row.3,
            expires_at: row.4,
        })
    }

    pub async fn list(&self, company_id: Uuid, filters: &InviteFilters) -> Result<Vec<Invite>, AppError> {
        let invites = sqlx::query_as::<_, Invite>(
            r#"
            SELECT * FROM invites
            WHERE company_id = $1
              AND ($2::invite_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(filters.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: InviteStatus) -> Result<Invite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Invite>(
            "UPDATE invites SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Convite"))
    }

    pub async fn mark_accepted<'e, E>(&self, executor: E, id: Uuid, user_id: Uuid) -> Result<Invite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, Invite>(
            r#"
            UPDATE invites
            SET status = 'accepted', accepted_at = NOW(), accepted_user_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(invite)
    }

    pub async fn renew<'e, E>(&self, executor: E, id: Uuid, expires_at: DateTime<Utc>) -> Result<Invite, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invite = sqlx::query_as::<_, Invite>(
            "UPDATE invites SET expires_at = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expires_at)
        .fetch_one(executor)
        .await?;
        Ok(invite)
    }

    /// Marca como expirados os convites pendentes fora do prazo.
    pub async fn expire_stale(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'expired', updated_at = NOW() WHERE status = 'pending' AND expires_at <= NOW()",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
