// src/models/prestador.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::pillar::Pillar;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prestador {
    pub id: Uuid,
    pub profile_id: Option<Uuid>,
    #[schema(example = "Dr. João Costa")]
    pub full_name: String,
    pub email: String,
    pub pillars: Vec<Pillar>,
    #[schema(example = json!(["ansiedade", "burnout"]))]
    pub specialties: Vec<String>,
    #[schema(example = "OPP-12345")]
    pub license_number: Option<String>,
    pub bio: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prestador {
    pub fn serves(&self, pillar: Pillar) -> bool {
        self.pillars.contains(&pillar)
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrestadorPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 1, message = "Indique pelo menos um pilar."))]
    pub pillars: Vec<Pillar>,
    #[serde(default)]
    pub specialties: Vec<String>,
    pub license_number: Option<String>,
    pub bio: Option<String>,
    /// Se presente, cria também o login do prestador.
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: Option<String>,
}

// Também é o formato das alterações pedidas pelo próprio prestador
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrestadorPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub full_name: Option<String>,
    #[validate(length(min = 1, message = "Indique pelo menos um pilar."))]
    pub pillars: Option<Vec<Pillar>>,
    pub specialties: Option<Vec<String>>,
    pub license_number: Option<String>,
    pub bio: Option<String>,
}

impl UpdatePrestadorPayload {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.pillars.is_none()
            && self.specialties.is_none()
            && self.license_number.is_none()
            && self.bio.is_none()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PrestadorFilters {
    pub pillar: Option<Pillar>,
    pub active: Option<bool>,
}
