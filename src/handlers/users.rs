// src/handlers/users.rs

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
        auth::Profile,
        sessions::{SessionAllocation, SessionBalance, SetAllocationPayload},
        users::{CreateUserPayload, UpdateUserPayload, UserFilters},
    },
};

#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Utilizador criado", body = Profile),
        (status = 409, description = "E-mail já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = app_state.user_service.create(admin.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Users",
    params(UserFilters, Pagination),
    responses((status = 200, description = "Lista de utilizadores", body = Vec<Profile>)),
    security(("api_jwt" = []))
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Query(filters): Query<UserFilters>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let users = app_state.user_service.list(&filters, page).await?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do utilizador")),
    responses(
        (status = 200, description = "Utilizador", body = Profile),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_user(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError> {
    let profile = app_state.user_service.get(id).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do utilizador")),
    request_body = UpdateUserPayload,
    responses((status = 200, description = "Utilizador atualizado", body = Profile)),
    security(("api_jwt" = []))
)]
pub async fn update_user(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<Profile>, ApiError> {
    let profile = app_state.user_service.update(admin.id, id, &payload).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}/sessions",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do utilizador")),
    responses((status = 200, description = "Saldo de sessões do utilizador", body = SessionBalance)),
    security(("api_jwt" = []))
)]
pub async fn get_user_sessions(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionBalance>, ApiError> {
    let balance = app_state.session_service.balance(id).await?;
    Ok(Json(balance))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/sessions",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do utilizador")),
    request_body = SetAllocationPayload,
    responses(
        (status = 200, description = "Nova alocação ativa", body = SessionAllocation),
        (status = 409, description = "Cota da empresa excedida")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_user_sessions(
    State(app_state): State<AppState>,
    AuthenticatedUser(admin): AuthenticatedUser,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAllocationPayload>,
) -> Result<Json<SessionAllocation>, ApiError> {
    let allocation = app_state.session_service.set_allocation(&admin, id, &payload).await?;
    Ok(Json(allocation))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}/sessions/history",
    tag = "Users",
    params(("id" = Uuid, Path, description = "ID do utilizador")),
    responses((status = 200, description = "Livro de alocações", body = Vec<SessionAllocation>)),
    security(("api_jwt" = []))
)]
pub async fn get_user_session_history(
    State(app_state): State<AppState>,
    _guard: RequireRole<AdminOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SessionAllocation>>, ApiError> {
    let history = app_state.session_service.history(id).await?;
    Ok(Json(history))
}
