// src/services/chat_service.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AiSettings,
    db::{AssessmentRepository, ChatRepository},
    models::{
        auth::Profile,
        chat::{ChatMessage, ChatReply, ChatRole, ChatSession, ChatStatus, ChatTranscript, SendMessagePayload, StartChatPayload},
        pillar::Pillar,
    },
};

const HISTORY_LIMIT: i64 = 20;
const DEFAULT_AI_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

// Fronteira com o modelo de linguagem
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AppError>;
}

/// Qualquer API com o formato `POST {base}/chat/completions`.
pub struct OpenAiCompatibleProvider {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http_client, api_url, api_key, model }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for OpenAiCompatibleProvider {
    async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.api_url.trim_end_matches('/'));
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&CompletionRequest { model: &self.model, messages })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::AiUnavailable(e.to_string()))?;

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::AiUnavailable(e.to_string()))?;
        extract_reply(body)
    }
}

pub struct UnconfiguredProvider;

#[async_trait]
impl ChatProvider for UnconfiguredProvider {
    async fn complete(&self, _messages: &[PromptMessage]) -> Result<String, AppError> {
        Err(AppError::AiUnavailable("AI_API_KEY não configurada".into()))
    }
}

pub fn provider_from_settings(settings: &AiSettings) -> Arc<dyn ChatProvider> {
    match &settings.api_key {
        Some(api_key) => {
            let api_url = settings.api_url.clone().unwrap_or_else(|| DEFAULT_AI_URL.to_string());
            tracing::info!(api_url = %api_url, model = %settings.model, "Assistente de IA configurado");
            Arc::new(OpenAiCompatibleProvider::new(api_url, api_key.clone(), settings.model.clone()))
        }
        None => {
            tracing::warn!("AI_API_KEY ausente, o chat responde 503");
            Arc::new(UnconfiguredProvider)
        }
    }
}

#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
    repo: ChatRepository,
    assessment_repo: AssessmentRepository,
    provider: Arc<dyn ChatProvider>,
}

impl ChatService {
    pub fn new(
        pool: PgPool,
        repo: ChatRepository,
        assessment_repo: AssessmentRepository,
        provider: Arc<dyn ChatProvider>,
    ) -> Self {
        Self { pool, repo, assessment_repo, provider }
    }

    pub async fn start(&self, user: &Profile, payload: &StartChatPayload) -> Result<ChatSession, AppError> {
        if let Some(assessment_id) = payload.assessment_id {
            // Só se liga a uma avaliação do próprio utilizador
            self.assessment_repo.find_for_user(assessment_id, user.id).await?;
        }

        let session = self
            .repo
            .create_session(&self.pool, user.id, payload.pillar, payload.assessment_id)
            .await?;
        tracing::info!(chat_id = %session.id, user_id = %user.id, pillar = payload.pillar.as_str(), "Conversa iniciada");
        Ok(session)
    }

    pub async fn get(&self, user: &Profile, id: Uuid) -> Result<ChatTranscript, AppError> {
        let session = self.repo.find_for_user(id, user.id).await?;
        let messages = self.repo.list_messages(id).await?;
        Ok(ChatTranscript { session, messages })
    }

    pub async fn list(&self, user: &Profile) -> Result<Vec<ChatSession>, AppError> {
        self.repo.list_for_user(user.id).await
    }

    pub async fn send_message(&self, user: &Profile, id: Uuid, payload: &SendMessagePayload) -> Result<ChatReply, AppError> {
        payload.validate()?;

        let session = self.repo.find_for_user(id, user.id).await?;
        if session.status != ChatStatus::Active {
            return Err(AppError::BadRequest(format!(
                "A conversa está '{}' e já não aceita mensagens.",
                status_name(session.status)
            )));
        }

        let user_message = self.repo.insert_message(id, ChatRole::User, payload.content.trim()).await?;
        let history = self.repo.recent_messages(id, HISTORY_LIMIT).await?;

        let reply = ask(self.provider.as_ref(), session.pillar, &history).await?;
        let assistant_message = self.repo.insert_message(id, ChatRole::Assistant, &reply).await?;

        tracing::debug!(chat_id = %id, history = history.len(), "Resposta do assistente gravada");
        Ok(ChatReply { user_message, assistant_message })
    }

    /// O utilizador pede um especialista; a marcação é feita depois pelo fluxo normal.
    pub async fn escalate(&self, user: &Profile, id: Uuid) -> Result<ChatSession, AppError> {
        let session = self.repo.find_for_user(id, user.id).await?;
        check_transition(session.status, ChatStatus::Escalated)?;

        let session = self.repo.set_status(id, ChatStatus::Escalated).await?;
        tracing::info!(chat_id = %id, pillar = session.pillar.as_str(), "Conversa encaminhada para especialista");
        Ok(session)
    }

    pub async fn close(&self, user: &Profile, id: Uuid) -> Result<ChatSession, AppError> {
        let session = self.repo.find_for_user(id, user.id).await?;
        check_transition(session.status, ChatStatus::Closed)?;
        self.repo.set_status(id, ChatStatus::Closed).await
    }
}

async fn ask(provider: &dyn ChatProvider, pillar: Pillar, history: &[ChatMessage]) -> Result<String, AppError> {
    let prompt = build_prompt(pillar, history);
    let reply = provider.complete(&prompt).await?;
    let reply = reply.trim();
    if reply.is_empty() {
        return Err(AppError::AiUnavailable("resposta vazia".into()));
    }
    Ok(reply.to_string())
}

fn build_prompt(pillar: Pillar, history: &[ChatMessage]) -> Vec<PromptMessage> {
    std::iter::once(PromptMessage { role: ChatRole::System.as_str(), content: system_prompt(pillar).to_string() })
        .chain(
            history
                .iter()
                .filter(|m| m.role != ChatRole::System)
                .map(|m| PromptMessage { role: m.role.as_str(), content: m.content.clone() }),
        )
        .collect()
}

fn extract_reply(body: CompletionResponse) -> Result<String, AppError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::AiUnavailable("resposta sem conteúdo".into()))
}

fn system_prompt(pillar: Pillar) -> &'static str {
    match pillar {
        Pillar::SaudeMental => {
            "És um assistente de bem-estar psicológico de um programa de apoio a colaboradores. \
             Responde em português europeu, com empatia e de forma breve. Não fazes diagnósticos. \
             Se a pessoa referir risco para si ou para outros, recomenda de imediato uma sessão com um especialista \
             e o contacto do SNS 24 (808 24 24 24)."
        }
        Pillar::BemEstarFisico => {
            "És um assistente de bem-estar físico. Dás orientações gerais sobre sono, atividade física, \
             postura e alimentação, em português europeu. Não substituis um médico."
        }
        Pillar::AssistenciaFinanceira => {
            "És um assistente de literacia financeira. Ajudas a organizar orçamento, dívidas e poupança, \
             em português europeu. Não recomendas produtos financeiros concretos."
        }
        Pillar::AssistenciaJuridica => {
            "És um assistente de informação jurídica geral em Portugal. Explicas conceitos em linguagem simples \
             e recomendas uma sessão com um jurista para casos concretos."
        }
    }
}

fn status_name(status: ChatStatus) -> &'static str {
    match status {
        ChatStatus::Active => "active",
        ChatStatus::Escalated => "escalated",
        ChatStatus::Closed => "closed",
    }
}

fn check_transition(from: ChatStatus, to: ChatStatus) -> Result<(), AppError> {
    let allowed = matches!(
        (from, to),
        (ChatStatus::Active, ChatStatus::Escalated) | (ChatStatus::Active | ChatStatus::Escalated, ChatStatus::Closed)
    );
    if !allowed {
        return Err(AppError::InvalidStatusTransition {
            from: status_name(from).to_string(),
            to: status_name(to).to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    fn message(role: ChatRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            chat_session_id: Uuid::nil(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    // Guarda o último prompt e responde com um texto fixo
    struct FakeProvider {
        reply: String,
        seen: Mutex<Vec<PromptMessage>>,
    }

    #[async_trait]
    impl ChatProvider for FakeProvider {
        async fn complete(&self, messages: &[PromptMessage]) -> Result<String, AppError> {
            if let Ok(mut seen) = self.seen.lock() {
                *seen = messages.to_vec();
            }
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn prompt_starts_with_pillar_system_message() {
        let history = vec![
            message(ChatRole::User, "Ando cansado"),
            message(ChatRole::Assistant, "Como tem dormido?"),
            message(ChatRole::User, "Mal"),
        ];
        let prompt = build_prompt(Pillar::BemEstarFisico, &history);

        assert_eq!(prompt.len(), 4);
        assert_eq!(prompt[0].role, "system");
        assert!(prompt[0].content.contains("bem-estar físico"));
        assert_eq!(prompt[1], PromptMessage { role: "user", content: "Ando cansado".into() });
        assert_eq!(prompt[2].role, "assistant");
    }

    #[test]
    fn reply_is_read_from_first_choice() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Olá!"}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(body).unwrap(), "Olá!");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(extract_reply(empty), Err(AppError::AiUnavailable(_))));
    }

    #[tokio::test]
    async fn missing_key_gives_unconfigured_provider() {
        let provider = provider_from_settings(&AiSettings::default());
        let err = provider.complete(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::AiUnavailable(_)));
    }

    #[tokio::test]
    async fn ask_sends_history_and_trims_reply() {
        let provider = FakeProvider { reply: "  Respire fundo.  ".into(), seen: Mutex::new(Vec::new()) };
        let history = vec![message(ChatRole::User, "Estou ansioso")];

        let reply = ask(&provider, Pillar::SaudeMental, &history).await.unwrap();
        assert_eq!(reply, "Respire fundo.");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].content, "Estou ansioso");
    }

    #[tokio::test]
    async fn blank_reply_is_an_error() {
        let provider = FakeProvider { reply: "   ".into(), seen: Mutex::new(Vec::new()) };
        let err = ask(&provider, Pillar::AssistenciaJuridica, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::AiUnavailable(_)));
    }

    #[test]
    fn only_active_chats_escalate_and_closed_is_final() {
        assert!(check_transition(ChatStatus::Active, ChatStatus::Escalated).is_ok());
        assert!(check_transition(ChatStatus::Escalated, ChatStatus::Closed).is_ok());
        assert!(check_transition(ChatStatus::Escalated, ChatStatus::Escalated).is_err());
        assert!(check_transition(ChatStatus::Closed, ChatStatus::Closed).is_err());
    }
}
