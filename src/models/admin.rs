// src/models/admin.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::pillar::Pillar;

// =============================================================================
//  ADMIN LOGS
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLog {
    pub id: Uuid,
    pub admin_id: Option<Uuid>,
    #[schema(example = "company.status_changed")]
    pub action: String,
    #[schema(example = "company")]
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AdminLogFilters {
    pub action: Option<String>,
    pub entity_type: Option<String>,
}

// =============================================================================
//  PEDIDOS DE ALTERAÇÃO (PRESTADORES)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "change_request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: Uuid,
    pub prestador_id: Uuid,
    pub requested_by: Uuid,
    pub changes: serde_json::Value,
    pub status: ChangeRequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewChangeRequestPayload {
    #[validate(length(max = 2000, message = "As notas são demasiado longas."))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ChangeRequestFilters {
    pub status: Option<ChangeRequestStatus>,
}

// =============================================================================
//  GESTÃO DE CASOS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "case_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::InProgress => "in_progress",
            CaseStatus::Closed => "closed",
        }
    }

    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (CaseStatus::Open, CaseStatus::InProgress | CaseStatus::Closed)
                | (CaseStatus::InProgress, CaseStatus::Closed)
        )
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub prestador_id: Option<Uuid>,
    pub pillar: Pillar,
    pub status: CaseStatus,
    pub summary: String,
    pub notes: Option<String>,
    pub opened_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenCasePayload {
    pub user_id: Uuid,
    pub pillar: Pillar,
    #[validate(length(min = 1, max = 500, message = "O resumo é obrigatório (máx. 500)."))]
    pub summary: String,
    pub prestador_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCasePayload {
    pub status: Option<CaseStatus>,
    pub notes: Option<String>,
    pub prestador_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CaseFilters {
    pub status: Option<CaseStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_lifecycle() {
        assert!(CaseStatus::Open.can_transition_to(CaseStatus::InProgress));
        assert!(CaseStatus::Open.can_transition_to(CaseStatus::Closed));
        assert!(CaseStatus::InProgress.can_transition_to(CaseStatus::Closed));
        assert!(!CaseStatus::Closed.can_transition_to(CaseStatus::Open));
        assert!(!CaseStatus::InProgress.can_transition_to(CaseStatus::Open));
    }
}
