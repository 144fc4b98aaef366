// src/handlers/invites.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
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
        auth::AuthResponse,
        invite::{
            AcceptInvitePayload, BulkInvitePayload, BulkInviteReport, CreateInvitePayload, Invite,
            InviteFilters, InvitePreview,
        },
    },
    services::invite_service,
};

// =============================================================================
//  PÚBLICO
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/invites/{code}",
    tag = "Invites",
    params(("code" = String, Path, description = "Código do convite")),
    responses(
        (status = 200, description = "Dados do convite (um pendente fora do prazo aparece como expirado)", body = InvitePreview),
        (status = 404, description = "Código desconhecido")
    )
)]
pub async fn preview_invite(
    State(app_state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<InvitePreview>, ApiError> {
    let preview = app_state.invite_service.preview(&code).await?;
    Ok(Json(preview))
}

#[utoipa::path(
    post,
    path = "/api/invites/accept",
    tag = "Invites",
    request_body = AcceptInvitePayload,
    responses(
        (status = 201, description = "Conta criada a partir do convite", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Empresa inativa"),
        (status = 404, description = "Código desconhecido, convite já usado ou cancelado"),
        (status = 409, description = "E-mail já registado ou cota da empresa excedida"),
        (status = 410, description = "Convite expirado")
    )
)]
pub async fn accept_invite(
    State(app_state): State<AppState>,
    Json(payload): Json<AcceptInvitePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let response = app_state.invite_service.accept(&payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// =============================================================================
//  RH
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/hr/invites",
    tag = "Invites",
    params(InviteFilters, ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses((status = 200, description = "Convites da empresa", body = Vec<Invite>)),
    security(("api_jwt" = []))
)]
pub async fn list_invites(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Query(filters): Query<InviteFilters>,
) -> Result<Json<Vec<Invite>>, ApiError> {
    let invites = app_state.invite_service.list(company_id, &filters).await?;
    Ok(Json(invites))
}

#[utoipa::path(
    post,
    path = "/api/hr/invites",
    tag = "Invites",
    request_body = CreateInvitePayload,
    params(("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses(
        (status = 201, description = "Convite criado e enviado", body = Invite),
        (status = 409, description = "E-mail já registado ou com convite pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invite(
    State(app_state): State<AppState>,
    AuthenticatedUser(hr): AuthenticatedUser,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Json(payload): Json<CreateInvitePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let invite = app_state.invite_service.create_invite(&hr, company_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

#[utoipa::path(
    post,
    path = "/api/hr/invites/bulk",
    tag = "Invites",
    request_body = BulkInvitePayload,
    params(("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses((status = 200, description = "Resultado linha a linha", body = BulkInviteReport)),
    security(("api_jwt" = []))
)]
pub async fn bulk_invites(
    State(app_state): State<AppState>,
    AuthenticatedUser(hr): AuthenticatedUser,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Json(payload): Json<BulkInvitePayload>,
) -> Result<Json<BulkInviteReport>, ApiError> {
    let report = app_state
        .invite_service
        .bulk_invites(&hr, company_id, &payload.csv)
        .await?;
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/hr/invites/template",
    tag = "Invites",
    responses((status = 200, description = "Modelo CSV para importação", content_type = "text/csv")),
    security(("api_jwt" = []))
)]
pub async fn invite_template(_guard: RequireRole<HrOrAdmin>) -> impl IntoResponse {
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
        (header::CONTENT_DISPOSITION, "attachment; filename=\"modelo_convites.csv\""),
    ];
    (headers, invite_service::template_csv())
}

#[utoipa::path(
    post,
    path = "/api/hr/invites/{id}/cancel",
    tag = "Invites",
    params(("id" = Uuid, Path, description = "ID do convite"), ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses(
        (status = 200, description = "Convite cancelado", body = Invite),
        (status = 409, description = "Convite não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_invite(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Invite>, ApiError> {
    let invite = app_state.invite_service.cancel(company_id, id).await?;
    Ok(Json(invite))
}

#[utoipa::path(
    post,
    path = "/api/hr/invites/{id}/resend",
    tag = "Invites",
    params(("id" = Uuid, Path, description = "ID do convite"), ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses(
        (status = 200, description = "Convite reenviado com nova validade", body = Invite),
        (status = 409, description = "Convite não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn resend_invite(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Path(id): Path<Uuid>,
) -> Result<Json<Invite>, ApiError> {
    let invite = app_state.invite_service.resend(company_id, id).await?;
    Ok(Json(invite))
}

#[utoipa::path(
    get,
    path = "/api/hr/invites/{id}/letter",
    tag = "Invites",
    params(("id" = Uuid, Path, description = "ID do convite"), ("x-company-id" = Option<Uuid>, Header, description = "Obrigatório para admin")),
    responses((status = 200, description = "Carta de convite em PDF com QR code", content_type = "application/pdf")),
    security(("api_jwt" = []))
)]
pub async fn invite_letter(
    State(app_state): State<AppState>,
    _guard: RequireRole<HrOrAdmin>,
    CompanyScope(company_id): CompanyScope,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf_bytes = app_state.invite_service.invite_letter_pdf(company_id, id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"convite_{}.pdf\"", id)),
    ];
    Ok((headers, pdf_bytes).into_response())
}
