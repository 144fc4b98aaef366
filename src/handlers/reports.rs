// src/handlers/reports.rs

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::roles::{AdminOnly, RequireRole},
    models::report::{ReportFilters, ReportSummary},
};

#[utoipa::path(
    get,
    path = "/api/admin/reports/summary",
    tag = "Reports",
    params(ReportFilters),
    responses(
        (status = 200, description = "Indicadores agregados da plataforma", body = ReportSummary),
        (status = 400, description = "Intervalo de datas inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn report_summary(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<ReportFilters>,
) -> Result<Json<ReportSummary>, ApiError> {
    let summary = app_state.report_service.summary(&filters).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/export.csv",
    tag = "Reports",
    params(ReportFilters),
    responses((status = 200, description = "Relatório em CSV", content_type = "text/csv")),
    security(("api_jwt" = []))
)]
pub async fn export_report_csv(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<ReportFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = app_state.report_service.export_csv(&filters).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"relatorio.csv\""),
    ];
    Ok((headers, csv).into_response())
}

#[utoipa::path(
    get,
    path = "/api/admin/reports/export.pdf",
    tag = "Reports",
    params(ReportFilters),
    responses((status = 200, description = "Relatório em PDF", content_type = "application/pdf")),
    security(("api_jwt" = []))
)]
pub async fn export_report_pdf(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<ReportFilters>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf_bytes = app_state.report_service.export_pdf(&filters).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"relatorio.pdf\""),
    ];
    Ok((headers, pdf_bytes).into_response())
}
