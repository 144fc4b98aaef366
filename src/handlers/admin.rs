// src/handlers/admin.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::Pagination, error::ApiError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        roles::{AdminOnly, RequireRole},
    },
    models::{
        admin::{
            AdminLog, AdminLogFilters, CaseFilters, CaseRecord, ChangeRequest, ChangeRequestFilters,
            OpenCasePayload, ReviewChangeRequestPayload, UpdateCasePayload,
        },
        booking::{Feedback, FeedbackFilters},
    },
};

// =============================================================================
//  PEDIDOS DE ALTERAÇÃO
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/change-requests",
    tag = "Admin",
    params(ChangeRequestFilters),
    responses((status = 200, description = "Pedidos de alteração", body = Vec<ChangeRequest>)),
    security(("api_jwt" = []))
)]
pub async fn list_change_requests(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<ChangeRequestFilters>,
) -> Result<Json<Vec<ChangeRequest>>, ApiError> {
    let requests = app_state.change_request_service.list(&filters).await?;
    Ok(Json(requests))
}

#[utoipa::path(
    post,
    path = "/api/admin/change-requests/{id}/approve",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = ReviewChangeRequestPayload,
    responses(
        (status = 200, description = "Pedido aprovado e aplicado à ficha", body = ChangeRequest),
        (status = 409, description = "Pedido já revisto")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_change_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewChangeRequestPayload>,
) -> Result<Json<ChangeRequest>, ApiError> {
    let request = app_state.change_request_service.approve(admin.id, id, &payload).await?;
    Ok(Json(request))
}

#[utoipa::path(
    post,
    path = "/api/admin/change-requests/{id}/reject",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    request_body = ReviewChangeRequestPayload,
    responses(
        (status = 200, description = "Pedido rejeitado", body = ChangeRequest),
        (status = 409, description = "Pedido já revisto")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_change_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewChangeRequestPayload>,
) -> Result<Json<ChangeRequest>, ApiError> {
    let request = app_state.change_request_service.reject(admin.id, id, &payload).await?;
    Ok(Json(request))
}

// =============================================================================
//  AUDITORIA E AVALIAÇÕES
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/logs",
    tag = "Admin",
    params(AdminLogFilters, Pagination),
    responses((status = 200, description = "Registo de ações administrativas", body = Vec<AdminLog>)),
    security(("api_jwt" = []))
)]
pub async fn list_admin_logs(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<AdminLogFilters>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<AdminLog>>, ApiError> {
    let logs = app_state.audit_service.list(&filters, page).await?;
    Ok(Json(logs))
}

#[utoipa::path(
    get,
    path = "/api/admin/feedback",
    tag = "Admin",
    params(FeedbackFilters, Pagination),
    responses((status = 200, description = "Avaliações das sessões", body = Vec<Feedback>)),
    security(("api_jwt" = []))
)]
pub async fn list_feedback(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<FeedbackFilters>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    let feedback = app_state.booking_service.list_feedback(&filters, page).await?;
    Ok(Json(feedback))
}

// =============================================================================
//  CASOS
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/admin/cases",
    tag = "Admin",
    request_body = OpenCasePayload,
    responses(
        (status = 201, description = "Caso aberto", body = CaseRecord),
        (status = 404, description = "Utilizador não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn open_case(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<OpenCasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let record = app_state.case_service.open(admin.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/admin/cases",
    tag = "Admin",
    params(CaseFilters),
    responses((status = 200, description = "Casos", body = Vec<CaseRecord>)),
    security(("api_jwt" = []))
)]
pub async fn list_cases(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<CaseFilters>,
) -> Result<Json<Vec<CaseRecord>>, ApiError> {
    let cases = app_state.case_service.list(&filters).await?;
    Ok(Json(cases))
}

#[utoipa::path(
    get,
    path = "/api/admin/cases/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do caso")),
    responses(
        (status = 200, description = "Caso", body = CaseRecord),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_case(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseRecord>, ApiError> {
    let record = app_state.case_service.get(id).await?;
    Ok(Json(record))
}

#[utoipa::path(
    patch,
    path = "/api/admin/cases/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "ID do caso")),
    request_body = UpdateCasePayload,
    responses(
        (status = 200, description = "Caso atualizado", body = CaseRecord),
        (status = 409, description = "Transição de estado inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_case(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCasePayload>,
) -> Result<Json<CaseRecord>, ApiError> {
    let record = app_state.case_service.update(admin.id, id, &payload).await?;
    Ok(Json(record))
}
