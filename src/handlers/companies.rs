// src/handlers/companies.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        roles::{AdminOnly, RequireRole},
    },
    models::company::{
        AddCompanySessionsPayload, Company, CompanyFilters, CompanyStatusChange, CreateCompanyPayload,
        SetCompanyStatusPayload, UpdateCompanyPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/admin/companies",
    tag = "Companies",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Empresa criada", body = Company),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Apenas admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let company = app_state.company_service.create(admin.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

#[utoipa::path(
    get,
    path = "/api/admin/companies",
    tag = "Companies",
    params(CompanyFilters),
    responses((status = 200, description = "Lista de empresas", body = Vec<Company>)),
    security(("api_jwt" = []))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<CompanyFilters>,
) -> Result<Json<Vec<Company>>, ApiError> {
    let companies = app_state.company_service.list(&filters).await?;
    Ok(Json(companies))
}

#[utoipa::path(
    get,
    path = "/api/admin/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses(
        (status = 200, description = "Empresa", body = Company),
        (status = 404, description = "Empresa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, ApiError> {
    let company = app_state.company_service.get(id).await?;
    Ok(Json(company))
}

#[utoipa::path(
    patch,
    path = "/api/admin/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    request_body = UpdateCompanyPayload,
    responses(
        (status = 200, description = "Empresa atualizada", body = Company),
        (status = 409, description = "O pool ficaria abaixo das sessões já atribuídas")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_company(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyPayload>,
) -> Result<Json<Company>, ApiError> {
    let company = app_state.company_service.update(admin.id, id, &payload).await?;
    Ok(Json(company))
}

#[utoipa::path(
    patch,
    path = "/api/admin/companies/{id}/status",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    request_body = SetCompanyStatusPayload,
    responses(
        (status = 200, description = "Estado alterado, com o número de perfis afetados", body = CompanyStatusChange)
    ),
    security(("api_jwt" = []))
)]
pub async fn set_company_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetCompanyStatusPayload>,
) -> Result<Json<CompanyStatusChange>, ApiError> {
    let change = app_state
        .company_service
        .set_status(admin.id, id, payload.is_active)
        .await?;
    Ok(Json(change))
}

#[utoipa::path(
    post,
    path = "/api/admin/companies/{id}/sessions",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    request_body = AddCompanySessionsPayload,
    responses((status = 200, description = "Pool de sessões aumentado", body = Company)),
    security(("api_jwt" = []))
)]
pub async fn add_company_sessions(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddCompanySessionsPayload>,
) -> Result<Json<Company>, ApiError> {
    let company = app_state.company_service.add_sessions(admin.id, id, &payload).await?;
    Ok(Json(company))
}
