// src/models/invite.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invite_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Expired => "expired",
            InviteStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    #[schema(example = "K7MPQ2XH")]
    pub invite_code: String,
    pub status: InviteStatus,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub sessions_allocated: i32,
    pub invited_by: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

// Dados de um convite prontos para inserir (vindos do formulário ou do CSV)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvitePayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    #[validate(range(min = 0, max = 1000, message = "Valor de sessões inválido."))]
    #[serde(default)]
    pub sessions_allocated: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkInvitePayload {
    /// Conteúdo CSV: `Nome,Email,Departamento,Cargo,Sessões`
    pub csv: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BulkRowStatus {
    Created,
    Failed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkInviteRowResult {
    pub line: usize,
    pub email: Option<String>,
    pub status: BulkRowStatus,
    pub invite_id: Option<Uuid>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkInviteReport {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    pub rows: Vec<BulkInviteRowResult>,
}

impl BulkInviteReport {
    pub fn from_rows(rows: Vec<BulkInviteRowResult>) -> Self {
        let created = rows.iter().filter(|r| r.status == BulkRowStatus::Created).count();
        Self {
            total: rows.len(),
            created,
            failed: rows.len() - created,
            rows,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcceptInvitePayload {
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    pub code: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: Option<String>,
}

// Vista pública do convite (sem dados internos)
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreview {
    pub email: String,
    pub full_name: Option<String>,
    pub company_name: String,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InviteFilters {
    pub status: Option<InviteStatus>,
}
