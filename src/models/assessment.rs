// src/models/assessment.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::pillar::Pillar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "assessment_outcome", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssessmentOutcome {
    AiChat,
    HumanSession,
}

pub const MIN_ANSWER: i32 = 0;
pub const MAX_ANSWER: i32 = 3;

pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
    /// Qualquer resposta acima de zero encaminha para um especialista.
    pub critical: bool,
}

pub struct Questionnaire {
    pub pillar: Pillar,
    pub title: &'static str,
    pub scale: [&'static str; 4],
    pub questions: &'static [Question],
}

static MENTAL_HEALTH: Questionnaire = Questionnaire {
    pillar: Pillar::SaudeMental,
    title: "Como se tem sentido nas últimas duas semanas?",
    scale: ["Nunca", "Vários dias", "Mais de metade dos dias", "Quase todos os dias"],
    questions: &[
        Question { id: "humor", text: "Sentiu-se em baixo, deprimido(a) ou sem esperança?", critical: false },
        Question { id: "interesse", text: "Teve pouco interesse ou prazer em fazer as coisas?", critical: false },
        Question { id: "ansiedade", text: "Sentiu-se nervoso(a), ansioso(a) ou tenso(a)?", critical: false },
        Question { id: "preocupacao", text: "Não conseguiu parar ou controlar as preocupações?", critical: false },
        Question { id: "sono", text: "Teve dificuldades em dormir ou dormiu demasiado?", critical: false },
        Question { id: "autolesao", text: "Teve pensamentos de que estaria melhor morto(a) ou de se magoar?", critical: true },
    ],
};

static FINANCIAL: Questionnaire = Questionnaire {
    pillar: Pillar::AssistenciaFinanceira,
    title: "Como está a sua situação financeira?",
    scale: ["Nada", "Pouco", "Bastante", "Muito"],
    questions: &[
        Question { id: "dividas", text: "Tem dificuldade em pagar dívidas ou prestações?", critical: false },
        Question { id: "despesas", text: "As despesas mensais ultrapassam o rendimento?", critical: false },
        Question { id: "poupanca", text: "Sente que não tem poupanças para imprevistos?", critical: false },
        Question { id: "stress", text: "A situação financeira afeta o seu sono ou bem-estar?", critical: false },
        Question { id: "incumprimento", text: "Está em risco de incumprimento, penhora ou despejo?", critical: true },
    ],
};

pub fn questionnaire_for(pillar: Pillar) -> Option<&'static Questionnaire> {
    match pillar {
        Pillar::SaudeMental => Some(&MENTAL_HEALTH),
        Pillar::AssistenciaFinanceira => Some(&FINANCIAL),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentAnswer {
    #[schema(example = "humor")]
    pub question_id: String,
    #[schema(example = 2)]
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub score: i32,
    pub max_score: i32,
    pub critical: bool,
    pub outcome: AssessmentOutcome,
}

impl Questionnaire {
    pub fn max_score(&self) -> i32 {
        self.questions.len() as i32 * MAX_ANSWER
    }

    /// Valida as respostas e decide o encaminhamento.
    pub fn evaluate(&self, answers: &[AssessmentAnswer]) -> Result<Evaluation, String> {
        let mut seen = HashSet::new();
        let mut score = 0;
        let mut critical = false;

        for answer in answers {
            let question = self
                .questions
                .iter()
                .find(|q| q.id == answer.question_id)
                .ok_or_else(|| format!("Pergunta desconhecida: '{}'.", answer.question_id))?;

            if !seen.insert(question.id) {
                return Err(format!("Pergunta respondida mais de uma vez: '{}'.", question.id));
            }
            if !(MIN_ANSWER..=MAX_ANSWER).contains(&answer.value) {
                return Err(format!(
                    "Resposta fora da escala ({}..={}) na pergunta '{}'.",
                    MIN_ANSWER, MAX_ANSWER, question.id
                ));
            }

            score += answer.value;
            critical |= question.critical && answer.value > 0;
        }

        if let Some(missing) = self.questions.iter().find(|q| !seen.contains(q.id)) {
            return Err(format!("Falta responder à pergunta '{}'.", missing.id));
        }

        let max_score = self.max_score();
        let outcome = if critical || score * 2 >= max_score {
            AssessmentOutcome::HumanSession
        } else {
            AssessmentOutcome::AiChat
        };

        Ok(Evaluation { score, max_score, critical, outcome })
    }

    pub fn view(&self) -> QuestionnaireView {
        QuestionnaireView {
            pillar: self.pillar,
            title: self.title.to_string(),
            scale: self.scale.iter().map(|s| s.to_string()).collect(),
            questions: self
                .questions
                .iter()
                .map(|q| QuestionView { id: q.id.to_string(), text: q.text.to_string() })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireView {
    pub pillar: Pillar,
    pub title: String,
    /// Rótulos dos valores 0..=3
    pub scale: Vec<String>,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pillar: Pillar,
    pub answers: serde_json::Value,
    pub score: i32,
    pub max_score: i32,
    pub outcome: AssessmentOutcome,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessmentPayload {
    pub pillar: Pillar,
    pub answers: Vec<AssessmentAnswer>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub assessment: Assessment,
    /// Preenchido quando o encaminhamento é para o chat
    pub chat_session_id: Option<Uuid>,
    #[schema(example = "Recomendamos uma sessão com um especialista.")]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(values: &[(&str, i32)]) -> Vec<AssessmentAnswer> {
        values
            .iter()
            .map(|(id, value)| AssessmentAnswer { question_id: id.to_string(), value: *value })
            .collect()
    }

    #[test]
    fn only_mental_health_and_financial_have_questionnaires() {
        assert!(questionnaire_for(Pillar::SaudeMental).is_some());
        assert!(questionnaire_for(Pillar::AssistenciaFinanceira).is_some());
        assert!(questionnaire_for(Pillar::BemEstarFisico).is_none());
        assert!(questionnaire_for(Pillar::AssistenciaJuridica).is_none());
    }

    #[test]
    fn low_score_goes_to_ai_chat() {
        let q = questionnaire_for(Pillar::SaudeMental).unwrap();
        let eval = q
            .evaluate(&answers(&[
                ("humor", 1),
                ("interesse", 1),
                ("ansiedade", 2),
                ("preocupacao", 1),
                ("sono", 1),
                ("autolesao", 0),
            ]))
            .unwrap();
        assert_eq!(eval.score, 6);
        assert_eq!(eval.max_score, 18);
        assert!(!eval.critical);
        assert_eq!(eval.outcome, AssessmentOutcome::AiChat);
    }

    #[test]
    fn half_of_max_score_goes_to_human() {
        let q = questionnaire_for(Pillar::SaudeMental).unwrap();
        let eval = q
            .evaluate(&answers(&[
                ("humor", 3),
                ("interesse", 2),
                ("ansiedade", 2),
                ("preocupacao", 1),
                ("sono", 1),
                ("autolesao", 0),
            ]))
            .unwrap();
        assert_eq!(eval.score, 9);
        assert_eq!(eval.outcome, AssessmentOutcome::HumanSession);
    }

    #[test]
    fn critical_answer_always_goes_to_human() {
        let q = questionnaire_for(Pillar::AssistenciaFinanceira).unwrap();
        let eval = q
            .evaluate(&answers(&[
                ("dividas", 0),
                ("despesas", 0),
                ("poupanca", 0),
                ("stress", 0),
                ("incumprimento", 1),
            ]))
            .unwrap();
        assert!(eval.critical);
        assert_eq!(eval.outcome, AssessmentOutcome::HumanSession);
    }

    #[test]
    fn rejects_incomplete_duplicate_unknown_and_out_of_range() {
        let q = questionnaire_for(Pillar::AssistenciaFinanceira).unwrap();

        let missing = q.evaluate(&answers(&[("dividas", 1)])).unwrap_err();
        assert!(missing.contains("Falta responder"));

        let duplicate = q.evaluate(&answers(&[("dividas", 1), ("dividas", 2)])).unwrap_err();
        assert!(duplicate.contains("mais de uma vez"));

        let unknown = q.evaluate(&answers(&[("humor", 1)])).unwrap_err();
        assert!(unknown.contains("desconhecida"));

        let out_of_range = q.evaluate(&answers(&[("dividas", 4)])).unwrap_err();
        assert!(out_of_range.contains("fora da escala"));
    }
}
