// src/handlers/prestadores.rs

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
        roles::{AdminOnly, PrestadorOnly, RequireRole},
    },
    models::{
        admin::ChangeRequest,
        booking::{BookingDetail, BookingFilters, Feedback},
        prestador::{CreatePrestadorPayload, Prestador, PrestadorFilters, UpdatePrestadorPayload},
        users::SetActivePayload,
    },
};

// =============================================================================
//  ADMIN
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/admin/prestadores",
    tag = "Prestadores",
    request_body = CreatePrestadorPayload,
    responses(
        (status = 201, description = "Prestador criado (com login se foi dada senha)", body = Prestador),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_prestador(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<CreatePrestadorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let prestador = app_state.prestador_service.create(admin.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(prestador)))
}

#[utoipa::path(
    get,
    path = "/api/admin/prestadores",
    tag = "Prestadores",
    params(PrestadorFilters),
    responses((status = 200, description = "Lista de prestadores", body = Vec<Prestador>)),
    security(("api_jwt" = []))
)]
pub async fn list_prestadores(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<PrestadorFilters>,
) -> Result<Json<Vec<Prestador>>, ApiError> {
    let prestadores = app_state.prestador_service.list(&filters).await?;
    Ok(Json(prestadores))
}

#[utoipa::path(
    get,
    path = "/api/admin/prestadores/{id}",
    tag = "Prestadores",
    params(("id" = Uuid, Path, description = "ID do prestador")),
    responses(
        (status = 200, description = "Prestador", body = Prestador),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_prestador(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<Prestador>, ApiError> {
    let prestador = app_state.prestador_service.get(id).await?;
    Ok(Json(prestador))
}

#[utoipa::path(
    patch,
    path = "/api/admin/prestadores/{id}",
    tag = "Prestadores",
    params(("id" = Uuid, Path, description = "ID do prestador")),
    request_body = UpdatePrestadorPayload,
    responses((status = 200, description = "Prestador atualizado", body = Prestador)),
    security(("api_jwt" = []))
)]
pub async fn update_prestador(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePrestadorPayload>,
) -> Result<Json<Prestador>, ApiError> {
    let prestador = app_state.prestador_service.update(admin.id, id, &payload).await?;
    Ok(Json(prestador))
}

#[utoipa::path(
    patch,
    path = "/api/admin/prestadores/{id}/status",
    tag = "Prestadores",
    params(("id" = Uuid, Path, description = "ID do prestador")),
    request_body = SetActivePayload,
    responses((status = 200, description = "Estado alterado (inclui o login)", body = Prestador)),
    security(("api_jwt" = []))
)]
pub async fn set_prestador_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetActivePayload>,
) -> Result<Json<Prestador>, ApiError> {
    let prestador = app_state
        .prestador_service
        .set_status(admin.id, id, payload.is_active)
        .await?;
    Ok(Json(prestador))
}

// =============================================================================
//  AUTOSSERVIÇO DO PRESTADOR
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/prestador/me",
    tag = "Prestador",
    responses(
        (status = 200, description = "Ficha do prestador autenticado", body = Prestador),
        (status = 404, description = "Login sem ficha de prestador")
    ),
    security(("api_jwt" = []))
)]
pub async fn my_prestador_profile(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    _guard: RequireRole<PrestadorOnly>,
) -> Result<Json<Prestador>, ApiError> {
    let prestador = app_state.prestador_service.my_profile(profile.id).await?;
    Ok(Json(prestador))
}

#[utoipa::path(
    post,
    path = "/api/prestador/change-requests",
    tag = "Prestador",
    request_body = UpdatePrestadorPayload,
    responses(
        (status = 201, description = "Pedido de alteração submetido", body = ChangeRequest),
        (status = 400, description = "Nada para alterar")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_change_request(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    _guard: RequireRole<PrestadorOnly>,
    Json(payload): Json<UpdatePrestadorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let request = app_state.change_request_service.submit(&profile, &payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[utoipa::path(
    get,
    path = "/api/prestador/bookings",
    tag = "Prestador",
    params(BookingFilters, Pagination),
    responses((status = 200, description = "Marcações do prestador", body = Vec<BookingDetail>)),
    security(("api_jwt" = []))
)]
pub async fn my_prestador_bookings(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    _guard: RequireRole<PrestadorOnly>,
    Query(filters): Query<BookingFilters>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BookingDetail>>, ApiError> {
    let bookings = app_state
        .booking_service
        .list_for_prestador(&profile, &filters, page)
        .await?;
    Ok(Json(bookings))
}

#[utoipa::path(
    get,
    path = "/api/prestador/feedback",
    tag = "Prestador",
    responses((status = 200, description = "Avaliações recebidas", body = Vec<Feedback>)),
    security(("api_jwt" = []))
)]
pub async fn my_prestador_feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
    _guard: RequireRole<PrestadorOnly>,
) -> Result<Json<Vec<Feedback>>, ApiError> {
    let feedback = app_state.booking_service.feedback_for_prestador(&profile).await?;
    Ok(Json(feedback))
}
