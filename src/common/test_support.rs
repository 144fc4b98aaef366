// src/common/test_support.rs

// Dados mínimos inseridos diretamente, sem passar pelas regras dos serviços

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    config::{AppState, Settings},
    models::{
        auth::{Profile, UserRole},
        booking::{Booking, BookingStatus},
        company::Company,
        sessions::{AllocationType, SessionAllocation},
    },
};

pub fn state(pool: PgPool) -> AppState {
    let settings = Settings::from_lookup(|key: &str| match key {
        "DATABASE_URL" => Some("postgres://localhost/wellness_test".to_string()),
        "JWT_SECRET" => Some("segredo-de-teste".to_string()),
        _ => None,
    })
    .unwrap();
    AppState::with_pool(pool, settings)
}

pub async fn company(pool: &PgPool, sessions_allocated: i32) -> Company {
    sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name, contact_email, sessions_allocated) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(format!("Empresa {}", Uuid::new_v4()))
    .bind("rh@empresa.pt")
    .bind(sessions_allocated)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn profile(pool: &PgPool, role: UserRole, company_id: Option<Uuid>) -> Profile {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (email, password_hash, full_name, role, company_id)
        VALUES ($1, 'sem-senha', 'Pessoa de Teste', $2, $3)
        RETURNING *
        "#,
    )
    .bind(format!("{}@teste.pt", Uuid::new_v4()))
    .bind(role)
    .bind(company_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn prestador(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO prestadores (full_name, email, pillars)
        VALUES ('Especialista de Teste', $1, ARRAY['saude_mental']::pillar[])
        RETURNING id
        "#,
    )
    .bind(format!("{}@clinica.pt", Uuid::new_v4()))
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Alocação ativa; para `company` acompanha o `sessions_used` da empresa.
pub async fn allocation(
    pool: &PgPool,
    user: &Profile,
    allocation_type: AllocationType,
    sessions_allocated: i32,
    sessions_used: i32,
) -> SessionAllocation {
    let company_id = match allocation_type {
        AllocationType::Company => user.company_id,
        AllocationType::Personal => None,
    };
    if let Some(company_id) = company_id {
        sqlx::query("UPDATE companies SET sessions_used = sessions_used + $2 WHERE id = $1")
            .bind(company_id)
            .bind(sessions_used)
            .execute(pool)
            .await
            .unwrap();
    }
    sqlx::query_as::<_, SessionAllocation>(
        r#"
        INSERT INTO session_allocations (user_id, company_id, allocation_type, sessions_allocated, sessions_used, reason)
        VALUES ($1, $2, $3, $4, $5, 'teste')
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(company_id)
    .bind(allocation_type)
    .bind(sessions_allocated)
    .bind(sessions_used)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Marcação confirmada, `hours_ago` horas no passado (cada valor dá um horário diferente).
pub async fn confirmed_booking(pool: &PgPool, user: &Profile, prestador_id: Uuid, hours_ago: i64) -> Booking {
    sqlx::query_as::<_, Booking>(
        r#"
        INSERT INTO bookings (user_id, prestador_id, company_id, pillar, scheduled_at, status)
        VALUES ($1, $2, $3, 'saude_mental', $4, $5)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(prestador_id)
    .bind(user.company_id)
    .bind(Utc::now() - Duration::hours(hours_ago))
    .bind(BookingStatus::Confirmed)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn active_allocations(pool: &PgPool, user_id: Uuid) -> Vec<SessionAllocation> {
    sqlx::query_as::<_, SessionAllocation>(
        "SELECT * FROM session_allocations WHERE user_id = $1 AND is_active ORDER BY allocation_type",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .unwrap()
}

pub async fn company_sessions_used(pool: &PgPool, company_id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT sessions_used FROM companies WHERE id = $1")
        .bind(company_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
