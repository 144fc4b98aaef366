// src/services/report_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ReportRepository,
    models::{
        booking::BookingStatus,
        invite::InviteStatus,
        report::{AdoptionReport, AdoptionTotals, PillarShare, ReportFilters, ReportSummary, ReportTotals},
    },
    services::document_service::DocumentService,
};

#[derive(Clone)]
pub struct ReportService {
    pool: PgPool,
    repo: ReportRepository,
    documents: DocumentService,
}

impl ReportService {
    pub fn new(pool: PgPool, repo: ReportRepository, documents: DocumentService) -> Self {
        Self { pool, repo, documents }
    }

    pub async fn summary(&self, filters: &ReportFilters) -> Result<ReportSummary, AppError> {
        validate_period(filters)?;
        let totals = self.repo.platform_totals(&self.pool, filters).await?;
        Ok(build_summary(filters, totals))
    }

    pub async fn export_csv(&self, filters: &ReportFilters) -> Result<String, AppError> {
        let summary = self.summary(filters).await?;
        Ok(summary_to_csv(&summary))
    }

    pub async fn export_pdf(&self, filters: &ReportFilters) -> Result<Vec<u8>, AppError> {
        let summary = self.summary(filters).await?;
        self.documents.report_pdf(&summary)
    }
}

fn validate_period(filters: &ReportFilters) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (filters.from, filters.to) {
        if from > to {
            return Err(AppError::BadRequest("A data inicial é posterior à data final.".into()));
        }
    }
    Ok(())
}

/// `part / whole` em percentagem com duas casas; denominador zero dá 0.
pub(crate) fn percentage(part: i64, whole: i64) -> Decimal {
    let mut value = if whole <= 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(part) * Decimal::ONE_HUNDRED / Decimal::from(whole)).round_dp(2)
    };
    value.rescale(2);
    value
}

pub(crate) fn build_summary(filters: &ReportFilters, totals: ReportTotals) -> ReportSummary {
    let count = |status: BookingStatus| {
        totals
            .by_status
            .iter()
            .filter(|row| row.status == status)
            .map(|row| row.total)
            .sum::<i64>()
    };

    let scheduled = count(BookingStatus::Scheduled);
    let confirmed = count(BookingStatus::Confirmed);
    let completed = count(BookingStatus::Completed);
    let cancelled = count(BookingStatus::Cancelled);
    let no_show = count(BookingStatus::NoShow);
    let total_bookings = scheduled + confirmed + completed + cancelled + no_show;

    let pillar_total: i64 = totals.by_pillar.iter().map(|p| p.total).sum();
    let by_pillar = totals
        .by_pillar
        .iter()
        .map(|p| PillarShare {
            pillar: p.pillar,
            total: p.total,
            percentage: percentage(p.total, pillar_total),
        })
        .collect();

    ReportSummary {
        from: filters.from,
        to: filters.to,
        company_id: filters.company_id,
        total_bookings,
        scheduled,
        confirmed,
        completed,
        cancelled,
        no_show,
        completion_rate: percentage(completed, total_bookings),
        cancellation_rate: percentage(cancelled, total_bookings),
        no_show_rate: percentage(no_show, total_bookings),
        by_pillar,
        total_companies: totals.total_companies,
        active_companies: totals.active_companies,
        active_users: totals.active_users,
        sessions_allocated: totals.sessions_allocated,
        sessions_used: totals.sessions_used,
        utilization_rate: percentage(totals.sessions_used, totals.sessions_allocated),
        average_rating: totals.average_rating.map(|r| r.round_dp(2)),
        feedback_count: totals.feedback_count,
    }
}

pub(crate) fn build_adoption_report(company_id: Uuid, totals: AdoptionTotals) -> AdoptionReport {
    let count = |status: InviteStatus| {
        totals
            .invites_by_status
            .iter()
            .filter(|row| row.status == status)
            .map(|row| row.total)
            .sum::<i64>()
    };

    let invites_pending = count(InviteStatus::Pending);
    let invites_accepted = count(InviteStatus::Accepted);
    let invites_expired = count(InviteStatus::Expired);
    let invites_cancelled = count(InviteStatus::Cancelled);
    let invites_total = invites_pending + invites_accepted + invites_expired + invites_cancelled;

    AdoptionReport {
        company_id,
        invites_total,
        invites_pending,
        invites_accepted,
        invites_expired,
        invites_cancelled,
        // Convites cancelados não contam para a adesão
        adoption_rate: percentage(invites_accepted, invites_total - invites_cancelled),
        registered_employees: totals.registered_employees,
        active_employees: totals.active_employees,
        employees_with_bookings: totals.employees_with_bookings,
        engagement_rate: percentage(totals.employees_with_bookings, totals.registered_employees),
        sessions_allocated: totals.sessions_allocated,
        sessions_used: totals.sessions_used,
        utilization_rate: percentage(totals.sessions_used, totals.sessions_allocated),
    }
}

pub(crate) fn summary_to_csv(summary: &ReportSummary) -> String {
    let mut rows: Vec<(String, String)> = vec![
        ("De".into(), summary.from.map(|d| d.to_rfc3339()).unwrap_or_default()),
        ("Até".into(), summary.to.map(|d| d.to_rfc3339()).unwrap_or_default()),
        ("Empresa".into(), summary.company_id.map(|id| id.to_string()).unwrap_or_default()),
        ("Total de marcações".into(), summary.total_bookings.to_string()),
        ("Agendadas".into(), summary.scheduled.to_string()),
        ("Confirmadas".into(), summary.confirmed.to_string()),
        ("Concluídas".into(), summary.completed.to_string()),
        ("Canceladas".into(), summary.cancelled.to_string()),
        ("Faltas".into(), summary.no_show.to_string()),
        ("Taxa de conclusão (%)".into(), summary.completion_rate.to_string()),
        ("Taxa de cancelamento (%)".into(), summary.cancellation_rate.to_string()),
        ("Taxa de faltas (%)".into(), summary.no_show_rate.to_string()),
        ("Empresas".into(), summary.total_companies.to_string()),
        ("Empresas ativas".into(), summary.active_companies.to_string()),
        ("Colaboradores ativos".into(), summary.active_users.to_string()),
        ("Sessões alocadas".into(), summary.sessions_allocated.to_string()),
        ("Sessões usadas".into(), summary.sessions_used.to_string()),
        ("Taxa de utilização (%)".into(), summary.utilization_rate.to_string()),
        (
            "Avaliação média".into(),
            summary.average_rating.map(|r| r.to_string()).unwrap_or_default(),
        ),
        ("Avaliações".into(), summary.feedback_count.to_string()),
    ];

    for share in &summary.by_pillar {
        rows.push((format!("Pilar: {}", share.pillar.label()), share.total.to_string()));
        rows.push((format!("Pilar: {} (%)", share.pillar.label()), share.percentage.to_string()));
    }

    let mut out = String::from("Indicador,Valor\n");
    for (label, value) in rows {
        out.push_str(&csv_field(&label));
        out.push(',');
        out.push_str(&csv_field(&value));
        out.push('\n');
    }
    out
}

/// Aspas só quando o campo precisa.
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        pillar::Pillar,
        report::{InviteStatusCount, PillarCount, StatusCount},
    };

    fn totals() -> ReportTotals {
        ReportTotals {
            by_status: vec![
                StatusCount { status: BookingStatus::Completed, total: 6 },
                StatusCount { status: BookingStatus::Cancelled, total: 2 },
                StatusCount { status: BookingStatus::Scheduled, total: 1 },
                StatusCount { status: BookingStatus::NoShow, total: 1 },
            ],
            by_pillar: vec![
                PillarCount { pillar: Pillar::SaudeMental, total: 7 },
                PillarCount { pillar: Pillar::AssistenciaJuridica, total: 3 },
            ],
            total_companies: 4,
            active_companies: 3,
            active_users: 25,
            sessions_allocated: 200,
            sessions_used: 6,
            average_rating: Some(Decimal::new(43333, 4)),
            feedback_count: 3,
        }
    }

    #[test]
    fn percentages_use_two_decimals_and_zero_denominator_is_zero() {
        assert_eq!(percentage(1, 3).to_string(), "33.33");
        assert_eq!(percentage(2, 3).to_string(), "66.67");
        assert_eq!(percentage(5, 0), Decimal::ZERO);
        assert_eq!(percentage(0, 10), Decimal::ZERO);
    }

    #[test]
    fn summary_reduces_counts_into_rates() {
        let summary = build_summary(&ReportFilters::default(), totals());

        assert_eq!(summary.total_bookings, 10);
        assert_eq!(summary.completed, 6);
        assert_eq!(summary.confirmed, 0);
        assert_eq!(summary.completion_rate.to_string(), "60.00");
        assert_eq!(summary.cancellation_rate.to_string(), "20.00");
        assert_eq!(summary.no_show_rate.to_string(), "10.00");
        assert_eq!(summary.utilization_rate.to_string(), "3.00");
        assert_eq!(summary.average_rating, Some(Decimal::new(433, 2)));

        assert_eq!(summary.by_pillar.len(), 2);
        assert_eq!(summary.by_pillar[0].percentage.to_string(), "70.00");
        assert_eq!(summary.by_pillar[1].percentage.to_string(), "30.00");
    }

    #[test]
    fn empty_period_has_zero_rates() {
        let summary = build_summary(&ReportFilters::default(), ReportTotals::default());
        assert_eq!(summary.total_bookings, 0);
        assert_eq!(summary.completion_rate, Decimal::ZERO);
        assert!(summary.by_pillar.is_empty());
        assert!(summary.average_rating.is_none());
    }

    #[test]
    fn adoption_ignores_cancelled_invites() {
        let totals = AdoptionTotals {
            invites_by_status: vec![
                InviteStatusCount { status: InviteStatus::Accepted, total: 6 },
                InviteStatusCount { status: InviteStatus::Pending, total: 2 },
                InviteStatusCount { status: InviteStatus::Cancelled, total: 2 },
            ],
            registered_employees: 6,
            active_employees: 5,
            employees_with_bookings: 3,
            sessions_allocated: 60,
            sessions_used: 15,
        };
        let report = build_adoption_report(Uuid::nil(), totals);

        assert_eq!(report.invites_total, 10);
        assert_eq!(report.adoption_rate.to_string(), "75.00");
        assert_eq!(report.engagement_rate.to_string(), "50.00");
        assert_eq!(report.utilization_rate.to_string(), "25.00");
    }

    #[test]
    fn csv_quotes_only_when_needed() {
        assert_eq!(csv_field("simples"), "simples");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("diz \"olá\""), "\"diz \"\"olá\"\"\"");
    }

    #[test]
    fn csv_export_has_header_and_pillar_rows() {
        let summary = build_summary(&ReportFilters::default(), totals());
        let csv = summary_to_csv(&summary);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("Indicador,Valor"));
        assert!(csv.contains("Total de marcações,10\n"));
        assert!(csv.contains("Pilar: Saúde Mental,7\n"));
        assert!(csv.contains("Pilar: Saúde Mental (%),70.00\n"));
    }
}
