// src/handlers/chat.rs

use axum::{
    extract::{Path, State},
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
        roles::{RequireRole, UserOnly},
    },
    models::chat::{ChatReply, ChatSession, ChatTranscript, SendMessagePayload, StartChatPayload},
};

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    request_body = StartChatPayload,
    responses((status = 201, description = "Conversa iniciada", body = ChatSession)),
    security(("api_jwt" = []))
)]
pub async fn start_chat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Json(payload): Json<StartChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let session = app_state.chat_service.start(&user, &payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/chat",
    tag = "Chat",
    responses((status = 200, description = "As minhas conversas", body = Vec<ChatSession>)),
    security(("api_jwt" = []))
)]
pub async fn list_chats(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let sessions = app_state.chat_service.list(&user).await?;
    Ok(Json(sessions))
}

#[utoipa::path(
    get,
    path = "/api/chat/{id}",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    responses(
        (status = 200, description = "Conversa com as mensagens", body = ChatTranscript),
        (status = 404, description = "Conversa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_chat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatTranscript>, ApiError> {
    let transcript = app_state.chat_service.get(&user, id).await?;
    Ok(Json(transcript))
}

#[utoipa::path(
    post,
    path = "/api/chat/{id}/messages",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "Mensagem e resposta do assistente", body = ChatReply),
        (status = 400, description = "Conversa já não está ativa"),
        (status = 503, description = "Assistente indisponível")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = app_state.chat_service.send_message(&user, id, &payload).await?;
    Ok(Json(reply))
}

#[utoipa::path(
    post,
    path = "/api/chat/{id}/escalate",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    responses(
        (status = 200, description = "Conversa encaminhada para especialista", body = ChatSession),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn escalate_chat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, ApiError> {
    let session = app_state.chat_service.escalate(&user, id).await?;
    Ok(Json(session))
}

#[utoipa::path(
    post,
    path = "/api/chat/{id}/close",
    tag = "Chat",
    params(("id" = Uuid, Path, description = "ID da conversa")),
    responses(
        (status = 200, description = "Conversa fechada", body = ChatSession),
        (status = 409, description = "Transição inválida")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_chat(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSession>, ApiError> {
    let session = app_state.chat_service.close(&user, id).await?;
    Ok(Json(session))
}
