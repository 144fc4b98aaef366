// src/models/users.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{auth::{Profile, UserRole}, sessions::SessionBalance};

// Criação privilegiada de utilizadores (apenas admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: String,
    pub role: UserRole,
    pub company_id: Option<Uuid>,
    pub department: Option<String>,
    pub job_title: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub company_id: Option<Uuid>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilters {
    pub role: Option<UserRole>,
    pub company_id: Option<Uuid>,
    pub search: Option<String>,
}

// Colaborador visto pelo RH: perfil + saldo de sessões
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    #[serde(flatten)]
    pub profile: Profile,
    pub balance: SessionBalance,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetActivePayload {
    pub is_active: bool,
}
