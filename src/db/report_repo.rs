// src/db/report_repo.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::report::{AdoptionTotals, InviteStatusCount, PillarCount, ReportFilters, ReportTotals, StatusCount},
};

// Só leitura: contagens que depois são reduzidas a percentagens no serviço
#[derive(Clone, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn platform_totals<'e, E>(&self, executor: E, filters: &ReportFilters) -> Result<ReportTotals, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Snapshot consistente de todas as contagens
        let mut tx = executor.begin().await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            r#"
            SELECT status, COUNT(*)::bigint AS total
            FROM bookings
            WHERE ($1::timestamptz IS NULL OR scheduled_at >= $1)
              AND ($2::timestamptz IS NULL OR scheduled_at < $2)
              AND ($3::uuid IS NULL OR company_id = $3)
            GROUP BY status
            "#,
        )
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.company_id)
        .fetch_all(&mut *tx)
        .await?;

        let by_pillar = sqlx::query_as::<_, PillarCount>(
            r#"
            SELECT pillar, COUNT(*)::bigint AS total
            FROM bookings
            WHERE ($1::timestamptz IS NULL OR scheduled_at >= $1)
              AND ($2::timestamptz IS NULL OR scheduled_at < $2)
              AND ($3::uuid IS NULL OR company_id = $3)
            GROUP BY pillar
            ORDER BY total DESC
            "#,
        )
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.company_id)
        .fetch_all(&mut *tx)
        .await?;

        let (total_companies, active_companies, sessions_allocated, sessions_used) =
            sqlx::query_as::<_, (i64, i64, i64, i64)>(
                r#"
                SELECT COUNT(*)::bigint,
                       COUNT(*) FILTER (WHERE is_active)::bigint,
                       COALESCE(SUM(sessions_allocated), 0)::bigint,
                       COALESCE(SUM(sessions_used), 0)::bigint
                FROM companies
                WHERE ($1::uuid IS NULL OR id = $1)
                "#,
            )
            .bind(filters.company_id)
            .fetch_one(&mut *tx)
            .await?;

        let active_users = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)::bigint FROM profiles
            WHERE role = 'user' AND is_active
              AND ($1::uuid IS NULL OR company_id = $1)
            "#,
        )
        .bind(filters.company_id)
        .fetch_one(&mut *tx)
        .await?;

        let (average_rating, feedback_count) = sqlx::query_as::<_, (Option<Decimal>, i64)>(
            r#"
            SELECT AVG(f.rating)::numeric, COUNT(f.id)::bigint
            FROM feedback f
            JOIN bookings b ON b.id = f.booking_id
            WHERE ($1::timestamptz IS NULL OR b.scheduled_at >= $1)
              AND ($2::timestamptz IS NULL OR b.scheduled_at < $2)
              AND ($3::uuid IS NULL OR b.company_id = $3)
            "#,
        )
        .bind(filters.from)
        .bind(filters.to)
        .bind(filters.company_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ReportTotals {
            by_status,
            by_pillar,
            total_companies,
            active_companies,
            active_users,
            sessions_allocated,
            sessions_used,
            average_rating,
            feedback_count,
        })
    }

    pub async fn adoption_totals<'e, E>(&self, executor: E, company_id: Uuid) -> Result<AdoptionTotals, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let invites_by_status = sqlx::query_as::<_, InviteStatusCount>(
            "SELECT status, COUNT(*)::bigint AS total FROM invites WHERE company_id = $1 GROUP BY status",
        )
        .bind(company_id)
        .fetch_all(&mut *tx)
        .await?;

        let (registered_employees, active_employees) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*)::bigint, COUNT(*) FILTER (WHERE is_active)::bigint
            FROM profiles
            WHERE company_id = $1 AND role = 'user'
            "#,
        )
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;

        let employees_with_bookings = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT b.user_id)::bigint
            FROM bookings b
            JOIN profiles p ON p.id = b.user_id
            WHERE p.company_id = $1 AND p.role = 'user'
            "#,
        )
        .bind(company_id)
        .fetch_one(&mut *tx)
        .await?;

        let (sessions_allocated, sessions_used) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT sessions_allocated::bigint, sessions_used::bigint FROM companies WHERE id = $1",
        )
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Empresa"))?;

        tx.commit().await?;

        Ok(AdoptionTotals {
            invites_by_status,
            registered_employees,
            active_employees,
            employees_with_bookings,
            sessions_allocated,
            sessions_used,
        })
    }
}
