// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::{
    db::{
        AdminRepository, AssessmentRepository, BookingRepository, ChatRepository, CompanyRepository,
        FeedbackRepository, InviteRepository, PrestadorRepository, ProfileRepository, ReportRepository,
        SessionRepository,
    },
    services::{
        assessment_service::AssessmentService,
        audit_service::AuditService,
        auth::AuthService,
        booking_service::BookingService,
        case_service::CaseService,
        change_request_service::ChangeRequestService,
        chat_service::{self, ChatService},
        company_service::CompanyService,
        document_service::DocumentService,
        email_service::EmailService,
        hr_service::HrService,
        invite_service::InviteService,
        prestador_service::PrestadorService,
        report_service::ReportService,
        session_service::SessionService,
        user_service::UserService,
    },
};

// SMTP opcional: sem host ou remetente, os e-mails são ignorados
#[derive(Debug, Clone, Default)]
pub struct EmailSettings {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_tls: bool,
    pub from_address: Option<String>,
    pub from_name: String,
}

impl EmailSettings {
    pub fn is_configured(&self) -> bool {
        self.smtp_host.is_some() && self.from_address.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AiSettings {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_expiration_days: i64,
    pub invite_expiration_days: i64,
    pub app_base_url: String,
    pub fonts_dir: String,
    pub email: EmailSettings,
    pub ai: AiSettings,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Lê a configuração de qualquer fonte chave -> valor.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &str| optional(key).with_context(|| format!("{} deve ser definida", key));

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            database_max_connections: parse_or(optional("DATABASE_MAX_CONNECTIONS"), "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            jwt_expiration_days: parse_or(optional("JWT_EXPIRATION_DAYS"), "JWT_EXPIRATION_DAYS", 7)?,
            invite_expiration_days: parse_or(optional("INVITE_EXPIRATION_DAYS"), "INVITE_EXPIRATION_DAYS", 7)?,
            app_base_url: optional("APP_BASE_URL").unwrap_or_else(|| "http://localhost:5173".to_string()),
            fonts_dir: optional("FONTS_DIR").unwrap_or_else(|| "./fonts".to_string()),
            email: EmailSettings {
                smtp_host: optional("SMTP_HOST"),
                smtp_port: parse_or(optional("SMTP_PORT"), "SMTP_PORT", 587)?,
                smtp_username: optional("SMTP_USERNAME"),
                smtp_password: optional("SMTP_PASSWORD"),
                smtp_tls: parse_or(optional("SMTP_TLS"), "SMTP_TLS", true)?,
                from_address: optional("EMAIL_FROM_ADDRESS"),
                from_name: optional("EMAIL_FROM_NAME").unwrap_or_else(|| "Bem-Estar".to_string()),
            },
            ai: AiSettings {
                api_url: optional("AI_API_URL"),
                api_key: optional("AI_API_KEY"),
                model: optional("AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
            },
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw.parse().with_context(|| format!("{} tem um valor inválido: '{}'", key, raw)),
        None => Ok(default),
    }
}

// O estado partilhado por toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub auth_service: AuthService,
    pub audit_service: AuditService,
    pub company_service: CompanyService,
    pub user_service: UserService,
    pub prestador_service: PrestadorService,
    pub change_request_service: ChangeRequestService,
    pub session_service: SessionService,
    pub booking_service: BookingService,
    pub invite_service: InviteService,
    pub hr_service: HrService,
    pub report_service: ReportService,
    pub case_service: CaseService,
    pub assessment_service: AssessmentService,
    pub chat_service: ChatService,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, settings))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, settings: Settings) -> Self {
        let settings = Arc::new(settings);

        let profile_repo = ProfileRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let prestador_repo = PrestadorRepository::new(db_pool.clone());
        let session_repo = SessionRepository::new(db_pool.clone());
        let booking_repo = BookingRepository::new(db_pool.clone());
        let feedback_repo = FeedbackRepository::new(db_pool.clone());
        let invite_repo = InviteRepository::new(db_pool.clone());
        let admin_repo = AdminRepository::new(db_pool.clone());
        let assessment_repo = AssessmentRepository::new(db_pool.clone());
        let chat_repo = ChatRepository::new(db_pool.clone());
        let report_repo = ReportRepository::new();

        let auth_service = AuthService::new(
            profile_repo.clone(),
            settings.jwt_secret.clone(),
            settings.jwt_expiration_days,
        );
        let audit_service = AuditService::new(admin_repo.clone());
        let document_service = DocumentService::new(settings.fonts_dir.clone());
        let email_service = EmailService::new(settings.email.clone());

        let session_service = SessionService::new(
            db_pool.clone(),
            session_repo.clone(),
            company_repo.clone(),
            profile_repo.clone(),
        );
        let company_service = CompanyService::new(
            db_pool.clone(),
            company_repo.clone(),
            profile_repo.clone(),
            audit_service.clone(),
        );
        let user_service = UserService::new(
            db_pool.clone(),
            profile_repo.clone(),
            company_repo.clone(),
            audit_service.clone(),
        );
        let prestador_service = PrestadorService::new(
            db_pool.clone(),
            prestador_repo.clone(),
            profile_repo.clone(),
            audit_service.clone(),
        );
        let change_request_service = ChangeRequestService::new(
            db_pool.clone(),
            admin_repo.clone(),
            prestador_repo.clone(),
            audit_service.clone(),
        );
        let booking_service = BookingService::new(
            db_pool.clone(),
            booking_repo,
            prestador_repo.clone(),
            feedback_repo,
            session_service.clone(),
        );
        let invite_service = InviteService::new(
            db_pool.clone(),
            invite_repo,
            company_repo.clone(),
            profile_repo.clone(),
            session_service.clone(),
            auth_service.clone(),
            email_service,
            document_service.clone(),
            settings.invite_expiration_days,
            settings.app_base_url.clone(),
        );
        let hr_service = HrService::new(
            db_pool.clone(),
            profile_repo.clone(),
            session_repo,
            report_repo.clone(),
            session_service.clone(),
        );
        let report_service = ReportService::new(db_pool.clone(), report_repo, document_service);
        let case_service = CaseService::new(admin_repo, profile_repo, audit_service.clone());
        let assessment_service = AssessmentService::new(db_pool.clone(), assessment_repo.clone(), chat_repo.clone());
        let chat_service = ChatService::new(
            db_pool.clone(),
            chat_repo,
            assessment_repo,
            chat_service::provider_from_settings(&settings.ai),
        );

        Self {
            db_pool,
            settings,
            auth_service,
            audit_service,
            company_service,
            user_service,
            prestador_service,
            change_request_service,
            session_service,
            booking_service,
            invite_service,
            hr_service,
            report_service,
            case_service,
            assessment_service,
            chat_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/wellness"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.database_max_connections, 5);
        assert_eq!(settings.jwt_expiration_days, 7);
        assert_eq!(settings.invite_expiration_days, 7);
        assert_eq!(settings.email.smtp_port, 587);
        assert!(settings.email.smtp_tls);
        assert!(!settings.email.is_configured());
        assert_eq!(settings.ai.model, "gpt-4o-mini");
        assert!(settings.ai.api_key.is_none());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Settings::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/wellness")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_is_reported_with_its_key() {
        let err = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/wellness"),
            ("JWT_SECRET", "segredo"),
            ("SMTP_PORT", "abc"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("SMTP_PORT"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let settings = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/wellness"),
            ("JWT_SECRET", "segredo"),
            ("SMTP_HOST", "  "),
            ("EMAIL_FROM_ADDRESS", "no-reply@bem-estar.pt"),
        ]))
        .unwrap();
        assert!(settings.email.smtp_host.is_none());
        assert!(!settings.email.is_configured());
    }
}
