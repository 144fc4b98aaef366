// src/models/report.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{booking::BookingStatus, invite::InviteStatus, pillar::Pillar};

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportFilters {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub company_id: Option<Uuid>,
}

// Linhas cruas vindas dos GROUP BY
#[derive(Debug, Clone, FromRow)]
pub struct StatusCount {
    pub status: BookingStatus,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PillarCount {
    pub pillar: Pillar,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct InviteStatusCount {
    pub status: InviteStatus,
    pub total: i64,
}

// Totais de plataforma lidos numa única transação
#[derive(Debug, Clone, Default)]
pub struct ReportTotals {
    pub by_status: Vec<StatusCount>,
    pub by_pillar: Vec<PillarCount>,
    pub total_companies: i64,
    pub active_companies: i64,
    pub active_users: i64,
    pub sessions_allocated: i64,
    pub sessions_used: i64,
    pub average_rating: Option<Decimal>,
    pub feedback_count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PillarShare {
    pub pillar: Pillar,
    pub total: i64,
    #[schema(example = "42.50")]
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub company_id: Option<Uuid>,
    pub total_bookings: i64,
    pub scheduled: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub no_show: i64,
    pub completion_rate: Decimal,
    pub cancellation_rate: Decimal,
    pub no_show_rate: Decimal,
    pub by_pillar: Vec<PillarShare>,
    pub total_companies: i64,
    pub active_companies: i64,
    pub active_users: i64,
    pub sessions_allocated: i64,
    pub sessions_used: i64,
    pub utilization_rate: Decimal,
    pub average_rating: Option<Decimal>,
    pub feedback_count: i64,
}

// ---
// Adesão (visão do RH)
// ---
#[derive(Debug, Clone, Default)]
pub struct AdoptionTotals {
    pub invites_by_status: Vec<InviteStatusCount>,
    pub registered_employees: i64,
    pub active_employees: i64,
    pub employees_with_bookings: i64,
    pub sessions_allocated: i64,
    pub sessions_used: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionReport {
    pub company_id: Uuid,
    pub invites_total: i64,
    pub invites_pending: i64,
    pub invites_accepted: i64,
    pub invites_expired: i64,
    pub invites_cancelled: i64,
    pub adoption_rate: Decimal,
    pub registered_employees: i64,
    pub active_employees: i64,
    pub employees_with_bookings: i64,
    pub engagement_rate: Decimal,
    pub sessions_allocated: i64,
    pub sessions_used: i64,
    pub utilization_rate: Decimal,
}
