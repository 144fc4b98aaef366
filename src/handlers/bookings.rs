// src/handlers/bookings.rs

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
        roles::{AdminOnly, BookingActor, RequireRole, UserOnly},
    },
    models::booking::{
        Booking, BookingDetail, BookingFilters, Feedback, FeedbackPayload, RequestSessionPayload,
        UpdateBookingStatusPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "Bookings",
    request_body = RequestSessionPayload,
    responses(
        (status = 201, description = "Sessão marcada", body = Booking),
        (status = 400, description = "Data no passado ou pilar não servido pelo prestador"),
        (status = 409, description = "Sem sessões disponíveis ou horário ocupado")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_session(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Json(payload): Json<RequestSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = app_state.booking_service.request_session(&user, &payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    tag = "Bookings",
    params(BookingFilters, Pagination),
    responses((status = 200, description = "As minhas marcações", body = Vec<BookingDetail>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_bookings(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Query(filters): Query<BookingFilters>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BookingDetail>>, ApiError> {
    let bookings = app_state.booking_service.list_for_user(user.id, &filters, page).await?;
    Ok(Json(bookings))
}

#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/status",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "ID da marcação")),
    request_body = UpdateBookingStatusPayload,
    responses(
        (status = 200, description = "Estado alterado; concluir desconta uma sessão e cancelar uma concluída devolve-a", body = Booking),
        (status = 403, description = "Sem permissão para esta transição"),
        (status = 409, description = "Transição inválida ou sem sessões")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_booking_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    _guard: RequireRole<BookingActor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusPayload>,
) -> Result<Json<Booking>, ApiError> {
    let booking = app_state
        .booking_service
        .update_status(&actor, id, payload.status)
        .await?;
    Ok(Json(booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/feedback",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "ID da marcação")),
    request_body = FeedbackPayload,
    responses(
        (status = 201, description = "Avaliação registada", body = Feedback),
        (status = 409, description = "Marcação não concluída ou já avaliada")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_feedback(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let feedback = app_state.booking_service.submit_feedback(&user, id, &payload).await?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

#[utoipa::path(
    get,
    path = "/api/admin/bookings",
    tag = "Bookings",
    params(BookingFilters, Pagination),
    responses((status = 200, description = "Todas as marcações", body = Vec<BookingDetail>)),
    security(("api_jwt" = []))
)]
pub async fn list_all_bookings(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<BookingFilters>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BookingDetail>>, ApiError> {
    let bookings = app_state.booking_service.list_all(&filters, page).await?;
    Ok(Json(bookings))
}
