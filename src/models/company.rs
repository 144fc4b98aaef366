// src/models/company.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// ---
// Empresa cliente (o "tenant" da plataforma)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[schema(example = "Acme Lda")]
    pub name: String,
    #[schema(example = "rh@acme.pt")]
    pub contact_email: String,
    pub contact_phone: Option<String>,
    #[schema(example = "premium")]
    pub plan_type: String,
    #[schema(example = 200)]
    pub sessions_allocated: i32,
    #[schema(example = 37)]
    pub sessions_used: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 1, message = "O nome da empresa é obrigatório."))]
    pub name: String,
    #[validate(email(message = "O e-mail de contacto é inválido."))]
    pub contact_email: String,
    pub contact_phone: Option<String>,
    #[validate(length(min = 1, message = "O plano é obrigatório."))]
    #[schema(example = "basic")]
    pub plan_type: String,
    #[validate(range(min = 0, message = "As sessões não podem ser negativas."))]
    #[serde(default)]
    pub sessions_allocated: i32,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyPayload {
    #[validate(length(min = 1, message = "O nome da empresa é obrigatório."))]
    pub name: Option<String>,
    #[validate(email(message = "O e-mail de contacto é inválido."))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[validate(length(min = 1, message = "O plano é obrigatório."))]
    pub plan_type: Option<String>,
    #[validate(range(min = 0, message = "As sessões não podem ser negativas."))]
    pub sessions_allocated: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetCompanyStatusPayload {
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddCompanySessionsPayload {
    #[validate(range(min = 1, message = "A quantidade tem de ser positiva."))]
    #[schema(example = 50)]
    pub amount: i32,
}

// Resultado do toggle de estado: a empresa e quantos perfis foram afetados
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStatusChange {
    pub company: Company,
    pub affected_profiles: u64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CompanyFilters {
    pub search: Option<String>,
    pub active: Option<bool>,
}
