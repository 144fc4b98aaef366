use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Erros de domínio. Os serviços e repositórios só conhecem este tipo;
// a conversão para HTTP acontece em `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Conta desativada")]
    InactiveAccount,

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{0} não encontrado(a)")]
    NotFound(&'static str),

    #[error("Requisição inválida: {0}")]
    BadRequest(String),

    #[error("Transição de estado inválida: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Sem sessões disponíveis")]
    NoSessionsAvailable,

    #[error("Cota da empresa excedida (disponível: {available}, pedido: {requested})")]
    CompanyQuotaExceeded { available: i32, requested: i32 },

    #[error("Empresa inativa")]
    CompanyInactive,

    #[error("Convite inválido")]
    InviteInvalid,

    #[error("Convite expirado")]
    InviteExpired,

    #[error("Já existe um convite pendente para {0}")]
    DuplicateInvite(String),

    #[error("Horário indisponível")]
    SlotUnavailable,

    #[error("Avaliação indisponível para o pilar {0}")]
    AssessmentUnavailable(String),

    #[error("Assistente de IA indisponível: {0}")]
    AiUnavailable(String),

    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Erro pronto para a resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn to_api_error(self) -> ApiError {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: "Um ou mais campos são inválidos.".to_string(),
                    details: Some(json!(details)),
                }
            }
            AppError::EmailAlreadyExists => {
                ApiError::new(StatusCode::CONFLICT, "Este e-mail já está em uso.")
            }
            AppError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.")
            }
            AppError::InvalidToken => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.",
            ),
            AppError::InactiveAccount => ApiError::new(
                StatusCode::FORBIDDEN,
                "Esta conta está desativada. Contacte o administrador.",
            ),
            AppError::Forbidden(reason) => ApiError::new(StatusCode::FORBIDDEN, reason),
            AppError::NotFound(entity) => {
                ApiError::new(StatusCode::NOT_FOUND, format!("{} não encontrado(a).", entity))
            }
            AppError::BadRequest(reason) => ApiError::new(StatusCode::BAD_REQUEST, reason),
            AppError::InvalidStatusTransition { from, to } => ApiError {
                status: StatusCode::CONFLICT,
                error: format!("Não é possível mudar o estado de '{}' para '{}'.", from, to),
                details: Some(json!({ "from": from, "to": to })),
            },
            AppError::NoSessionsAvailable => ApiError::new(
                StatusCode::CONFLICT,
                "Não existem sessões disponíveis para este utilizador.",
            ),
            AppError::CompanyQuotaExceeded { available, requested } => ApiError {
                status: StatusCode::CONFLICT,
                error: "As sessões pedidas excedem a cota disponível da empresa.".to_string(),
                details: Some(json!({ "available": available, "requested": requested })),
            },
            AppError::CompanyInactive => {
                ApiError::new(StatusCode::FORBIDDEN, "A empresa está inativa.")
            }
            AppError::InviteInvalid => {
                ApiError::new(StatusCode::NOT_FOUND, "Convite inválido ou já utilizado.")
            }
            AppError::InviteExpired => ApiError::new(StatusCode::GONE, "Este convite expirou."),
            AppError::DuplicateInvite(email) => ApiError::new(
                StatusCode::CONFLICT,
                format!("Já existe um convite pendente para {}.", email),
            ),
            AppError::SlotUnavailable => ApiError::new(
                StatusCode::CONFLICT,
                "O especialista já tem uma sessão marcada neste horário.",
            ),
            AppError::AssessmentUnavailable(pillar) => ApiError::new(
                StatusCode::BAD_REQUEST,
                format!("Não existe avaliação guiada para o pilar '{}'.", pillar),
            ),
            AppError::AiUnavailable(reason) => {
                tracing::warn!(reason = %reason, "Assistente de IA indisponível");
                ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "O assistente virtual está indisponível de momento.",
                )
            }
            AppError::UniqueConstraintViolation(message) => {
                ApiError::new(StatusCode::CONFLICT, message)
            }
            AppError::DatabaseError(sqlx::Error::RowNotFound) => {
                ApiError::new(StatusCode::NOT_FOUND, "Registo não encontrado.")
            }

            // Todos os outros erros viram 500; o detalhe fica só no log.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.",
                )
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        err.to_api_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "E-mail inválido."))]
        email: String,
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Sample { email: "nope".into() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error();

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["email"][0], "E-mail inválido.");
    }

    #[test]
    fn domain_errors_map_to_expected_status() {
        assert_eq!(AppError::InvalidCredentials.to_api_error().status, StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InactiveAccount.to_api_error().status, StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("Empresa").to_api_error().status, StatusCode::NOT_FOUND);
        assert_eq!(AppError::NoSessionsAvailable.to_api_error().status, StatusCode::CONFLICT);
        assert_eq!(AppError::InviteExpired.to_api_error().status, StatusCode::GONE);
        assert_eq!(
            AppError::AiUnavailable("sem chave".into()).to_api_error().status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn row_not_found_is_404_and_other_db_errors_are_500() {
        let api = AppError::DatabaseError(sqlx::Error::RowNotFound).to_api_error();
        assert_eq!(api.status, StatusCode::NOT_FOUND);

        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_api_error();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "Ocorreu um erro inesperado.");
    }

    #[test]
    fn quota_error_exposes_numbers() {
        let api = AppError::CompanyQuotaExceeded { available: 3, requested: 5 }.to_api_error();
        let details = api.details.unwrap();
        assert_eq!(details["available"], 3);
        assert_eq!(details["requested"], 5);
    }
}
