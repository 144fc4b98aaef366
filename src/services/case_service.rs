// src/services/case_service.rs

use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{AdminRepository, ProfileRepository},
    models::admin::{CaseFilters, CaseRecord, CaseStatus, OpenCasePayload, UpdateCasePayload},
    services::audit_service::AuditService,
};

// Acompanhamento de casos sensíveis pelo admin
#[derive(Clone)]
pub struct CaseService {
    repo: AdminRepository,
    profile_repo: ProfileRepository,
    audit: AuditService,
}

impl CaseService {
    pub fn new(repo: AdminRepository, profile_repo: ProfileRepository, audit: AuditService) -> Self {
        Self { repo, profile_repo, audit }
    }

    pub async fn open(&self, admin_id: Uuid, payload: &OpenCasePayload) -> Result<CaseRecord, AppError> {
        payload.validate()?;
        self.profile_repo
            .find_by_id(payload.user_id)
            .await?
            .ok_or(AppError::NotFound("Utilizador"))?;

        let record = self.repo.open_case(admin_id, payload).await?;
        self.audit
            .record(
                admin_id,
                "case.opened",
                "case",
                Some(record.id),
                json!({ "user_id": record.user_id, "pillar": record.pillar }),
            )
            .await;
        Ok(record)
    }

    pub async fn list(&self, filters: &CaseFilters) -> Result<Vec<CaseRecord>, AppError> {
        self.repo.list_cases(filters).await
    }

    pub async fn get(&self, id: Uuid) -> Result<CaseRecord, AppError> {
        self.repo.find_case(id).await
    }

    pub async fn update(&self, admin_id: Uuid, id: Uuid, changes: &UpdateCasePayload) -> Result<CaseRecord, AppError> {
        let current = self.repo.find_case(id).await?;
        if let Some(next) = changes.status {
            check_transition(current.status, next)?;
        }

        let record = self.repo.update_case(id, changes).await?;
        self.audit
            .record(
                admin_id,
                "case.updated",
                "case",
                Some(id),
                json!({ "from": current.status, "to": record.status }),
            )
            .await;
        Ok(record)
    }
}

fn check_transition(from: CaseStatus, to: CaseStatus) -> Result<(), AppError> {
    if !from.can_transition_to(to) {
        return Err(AppError::InvalidStatusTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_cases_do_not_reopen() {
        assert!(check_transition(CaseStatus::Open, CaseStatus::InProgress).is_ok());
        assert!(check_transition(CaseStatus::InProgress, CaseStatus::Closed).is_ok());

        match check_transition(CaseStatus::Closed, CaseStatus::Open) {
            Err(AppError::InvalidStatusTransition { from, to }) => {
                assert_eq!(from, "closed");
                assert_eq!(to, "open");
            }
            other => panic!("esperava transição inválida, veio {:?}", other),
        }
    }
}
