// src/db/booking_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{map_unique_violation, Pagination},
        error::AppError,
    },
    models::booking::{Booking, BookingDetail, BookingFilters, BookingStatus, RequestSessionPayload},
};

// Restrições extra aplicadas por quem lista (o próprio utilizador, o prestador)
#[derive(Debug, Default, Clone, Copy)]
pub struct BookingScope {
    pub user_id: Option<Uuid>,
    pub prestador_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_booking<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        company_id: Option<Uuid>,
        payload: &RequestSessionPayload,
    ) -> Result<Booking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (user_id, prestador_id, company_id, pillar, scheduled_at, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(payload.prestador_id)
        .bind(company_id)
        .bind(payload.pillar)
        .bind(payload.scheduled_at)
        .bind(payload.notes.as_deref())
        .fetch_one(executor)
        .await
        .map_err(|e| map_unique_violation(e, AppError::SlotUnavailable))
    }

    pub async fn slot_taken<'e, E>(
        &self,
        executor: E,
        prestador_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE prestador_id = $1
                  AND scheduled_at = $2
                  AND status = ANY($3)
            )
            "#,
        )
        .bind(prestador_id)
        .bind(scheduled_at)
        .bind(BookingStatus::OPEN.to_vec())
        .fetch_one(executor)
        .await?;
        Ok(taken)
    }

    // Marcações ainda por realizar; cada uma vai consumir uma sessão ao ser concluída
    pub async fn count_open_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let open = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE user_id = $1 AND status = ANY($2)")
            .bind(user_id)
            .bind(BookingStatus::OPEN.to_vec())
            .fetch_one(executor)
            .await?;
        Ok(open)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Booking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Marcação"))
    }

    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Booking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Marcação"))
    }

    pub async fn update_status<'e, E>(&self, executor: E, id: Uuid, status: BookingStatus) -> Result<Booking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET
                status       = $2,
                completed_at = CASE WHEN $2 = 'completed'::booking_status THEN NOW() ELSE completed_at END,
                cancelled_at = CASE WHEN $2 = 'cancelled'::booking_status THEN NOW() ELSE cancelled_at END,
                updated_at   = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    pub async fn set_session_usage<'e, E>(&self, executor: E, id: Uuid, usage_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE bookings SET session_usage_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(usage_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_details(
        &self,
        filters: &BookingFilters,
        scope: BookingScope,
        page: Pagination,
    ) -> Result<Vec<BookingDetail>, AppError> {
        let rows = sqlx::query_as::<_, BookingDetail>(
            r#"
            SELECT b.*,
                   u.full_name AS user_name,
                   p.full_name AS prestador_name,
                   c.name      AS company_name
            FROM bookings b
            JOIN profiles u ON u.id = b.user_id
            JOIN prestadores p ON p.id = b.prestador_id
            LEFT JOIN companies c ON c.id = b.company_id
            WHERE ($1::booking_status IS NULL OR b.status = $1)
              AND ($2::pillar IS NULL OR b.pillar = $2)
              AND ($3::uuid IS NULL OR b.company_id = $3)
              AND ($4::uuid IS NULL OR b.prestador_id = $4)
              AND ($5::timestamptz IS NULL OR b.scheduled_at >= $5)
              AND ($6::timestamptz IS NULL OR b.scheduled_at < $6)
              AND ($7::uuid IS NULL OR b.user_id = $7)
              AND ($8::uuid IS NULL OR b.prestador_id = $8)
            ORDER BY b.scheduled_at DESC
            LIMIT $9 OFFSET $10
            "#,
        )
        .bind(filters.status)
        .bind(filters.pillar)
        .bind(filters.company_id)
        .bind(filters.prestador_id)
        .bind(filters.from)
        .bind(filters.to)
        .bind(scope.user_id)
        .bind(scope.prestador_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
