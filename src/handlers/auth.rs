// src/handlers/auth.rs

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{AuthResponse, LoginUserPayload, Profile},
        sessions::{SessionAllocation, SessionBalance},
    },
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "E-mail ou senha inválidos"),
        (status = 403, description = "Conta desativada")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let response = app_state.auth_service.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Me",
    responses(
        (status = 200, description = "Perfil autenticado", body = Profile),
        (status = 401, description = "Não autorizado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(profile): AuthenticatedUser) -> Json<Profile> {
    Json(profile)
}

#[utoipa::path(
    get,
    path = "/api/me/sessions",
    tag = "Me",
    responses(
        (status = 200, description = "Saldo de sessões (empresa + pessoal)", body = SessionBalance)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_sessions(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<Json<SessionBalance>, ApiError> {
    let balance = app_state.session_service.balance(profile.id).await?;
    Ok(Json(balance))
}

#[utoipa::path(
    get,
    path = "/api/me/sessions/history",
    tag = "Me",
    responses(
        (status = 200, description = "Histórico de alocações, mais recentes primeiro", body = Vec<SessionAllocation>)
    ),
    security(("api_jwt" = []))
)]
pub async fn my_session_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(profile): AuthenticatedUser,
) -> Result<Json<Vec<SessionAllocation>>, ApiError> {
    let history = app_state.session_service.history(profile.id).await?;
    Ok(Json(history))
}
