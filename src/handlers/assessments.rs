// src/handlers/assessments.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        roles::{RequireRole, UserOnly},
    },
    models::{
        assessment::{Assessment, AssessmentResult, QuestionnaireView, SubmitAssessmentPayload},
        pillar::Pillar,
    },
};

#[utoipa::path(
    get,
    path = "/api/assessments/questionnaires/{pillar}",
    tag = "Assessments",
    params(("pillar" = Pillar, Path, description = "Pilar do questionário")),
    responses(
        (status = 200, description = "Perguntas e escala de respostas", body = QuestionnaireView),
        (status = 400, description = "Pilar sem questionário")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_questionnaire(
    State(app_state): State<AppState>,
    _guard: RequireRole<UserOnly>,
    Path(pillar): Path<Pillar>,
) -> Result<Json<QuestionnaireView>, ApiError> {
    let view = app_state.assessment_service.questionnaire(pillar)?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/api/assessments",
    tag = "Assessments",
    request_body = SubmitAssessmentPayload,
    responses(
        (status = 201, description = "Avaliação gravada com o encaminhamento sugerido", body = AssessmentResult),
        (status = 400, description = "Respostas incompletas ou fora da escala")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_assessment(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
    Json(payload): Json<SubmitAssessmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state.assessment_service.submit(&user, &payload).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[utoipa::path(
    get,
    path = "/api/assessments",
    tag = "Assessments",
    responses((status = 200, description = "As minhas avaliações", body = Vec<Assessment>)),
    security(("api_jwt" = []))
)]
pub async fn list_my_assessments(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    _guard: RequireRole<UserOnly>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    let assessments = app_state.assessment_service.list_mine(&user).await?;
    Ok(Json(assessments))
}
