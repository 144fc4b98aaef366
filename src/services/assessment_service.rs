// src/services/assessment_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::{AssessmentRepository, ChatRepository},
    models::{
        assessment::{
            questionnaire_for, Assessment, AssessmentOutcome, AssessmentResult, QuestionnaireView,
            SubmitAssessmentPayload,
        },
        auth::Profile,
        pillar::Pillar,
    },
};

#[derive(Clone)]
pub struct AssessmentService {
    pool: PgPool,
    repo: AssessmentRepository,
    chat_repo: ChatRepository,
}

impl AssessmentService {
    pub fn new(pool: PgPool, repo: AssessmentRepository, chat_repo: ChatRepository) -> Self {
        Self { pool, repo, chat_repo }
    }

    pub fn questionnaire(&self, pillar: Pillar) -> Result<QuestionnaireView, AppError> {
        questionnaire_for(pillar)
            .map(|q| q.view())
            .ok_or_else(|| AppError::AssessmentUnavailable(pillar.as_str().to_string()))
    }

    /// Grava a avaliação e, quando o encaminhamento é para o chat, abre a conversa na mesma transação.
    pub async fn submit(&self, user: &Profile, payload: &SubmitAssessmentPayload) -> Result<AssessmentResult, AppError> {
        let questionnaire = questionnaire_for(payload.pillar)
            .ok_or_else(|| AppError::AssessmentUnavailable(payload.pillar.as_str().to_string()))?;
        let evaluation = questionnaire.evaluate(&payload.answers).map_err(AppError::BadRequest)?;
        let answers = serde_json::to_value(&payload.answers).map_err(anyhow::Error::from)?;

        let mut tx = self.pool.begin().await?;
        let assessment = self
            .repo
            .create_assessment(
                &mut *tx,
                user.id,
                payload.pillar,
                &answers,
                evaluation.score,
                evaluation.max_score,
                evaluation.outcome,
            )
            .await?;

        let chat_session_id = match evaluation.outcome {
            AssessmentOutcome::AiChat => Some(
                self.chat_repo
                    .create_session(&mut *tx, user.id, payload.pillar, Some(assessment.id))
                    .await?
                    .id,
            ),
            AssessmentOutcome::HumanSession => None,
        };
        tx.commit().await?;

        // O conteúdo das respostas não vai para o log
        tracing::info!(
            assessment_id = %assessment.id,
            user_id = %user.id,
            pillar = payload.pillar.as_str(),
            outcome = ?evaluation.outcome,
            "Avaliação submetida"
        );

        Ok(AssessmentResult {
            message: outcome_message(evaluation.outcome).to_string(),
            assessment,
            chat_session_id,
        })
    }

    pub async fn list_mine(&self, user: &Profile) -> Result<Vec<Assessment>, AppError> {
        self.repo.list_for_user(user.id).await
    }
}

fn outcome_message(outcome: AssessmentOutcome) -> &'static str {
    match outcome {
        AssessmentOutcome::HumanSession => "Recomendamos uma sessão com um especialista.",
        AssessmentOutcome::AiChat => "Pode começar já uma conversa com o nosso assistente virtual.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_differ_by_outcome() {
        assert_ne!(
            outcome_message(AssessmentOutcome::HumanSession),
            outcome_message(AssessmentOutcome::AiChat)
        );
    }

    #[test]
    fn questionnaire_view_needs_a_supported_pillar() {
        let view = questionnaire_for(Pillar::SaudeMental).map(|q| q.view()).unwrap();
        assert_eq!(view.scale.len(), 4);
        assert!(view.questions.iter().any(|q| q.id == "autolesao"));
        assert!(questionnaire_for(Pillar::BemEstarFisico).is_none());
    }
}
