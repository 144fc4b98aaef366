// src/handlers/hr.rs

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        company::CompanyScope,
        roles::{HrOrAdmin, RequireRole},
    },
    models::{
        auth::Profile,
        report::AdoptionReport,
        sessions::{SessionAllocation, SetAllocationPayload},
        users::{EmployeeSummary, SetActivePayload},
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmployeeFilters {
    /// Pesquisa por nome ou e-mail
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/hr/employees",
    tag = "HR",
    params(EmployeeFilters, ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses((status = 200, description = "Colaboradores com saldo de sessões", body = Vec<EmployeeSummary>)),
    security(("api_jwt" = []))
)]
pub async fn list_employees(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Query(filters): Query<EmployeeFilters>,
) -> Result<Json<Vec<EmployeeSummary>>, ApiError> {
    let employees = app_state
        .hr_service
        .list_employees(company_id, filters.search.as_deref())
        .await?;
    Ok(Json(employees))
}

#[utoipa::path(
    put,
    path = "/api/hr/employees/{id}/sessions",
    tag = "HR",
    params(("id" = Uuid, Path, description = "ID do colaborador"), ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    request_body = SetAllocationPayload,
    responses(
        (status = 200, description = "Nova alocação ativa", body = SessionAllocation),
        (status = 409, description = "Excede o saldo da empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_employee_sessions(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAllocationPayload>,
) -> Result<Json<SessionAllocation>, ApiError> {
    let allocation = app_state
        .hr_service
        .set_employee_sessions(&actor, company_id, id, &payload)
        .await?;
    Ok(Json(allocation))
}

#[utoipa::path(
    patch,
    path = "/api/hr/employees/{id}/status",
    tag = "HR",
    params(("id" = Uuid, Path, description = "ID do colaborador"), ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    request_body = SetActivePayload,
    responses((status = 200, description = "Estado do colaborador alterado", body = Profile)),
    security(("api_jwt" = []))
)]
pub async fn set_employee_status(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<Json<Profile>, ApiError> {
    let profile = app_state
        .hr_service
        .set_employee_status(company_id, id, payload.is_active)
        .await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/hr/adoption",
    tag = "HR",
    params(("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses((status = 200, description = "Taxa de adesão aos convites", body = AdoptionReport)),
    security(("api_jwt" = []))
)]
pub async fn adoption_report(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
) -> Result<Json<AdoptionReport>, ApiError> {
    let report = app_state.hr_service.adoption_report(company_id).await?;
    Ok(Json(report))
}
