// src/services/change_request_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{AdminRepository, PrestadorRepository},
    models::{
        admin::{ChangeRequest, ChangeRequestFilters, ChangeRequestStatus, ReviewChangeRequestPayload},
        auth::Profile,
        prestador::UpdatePrestadorPayload,
    },
    services::audit_service::AuditService,
};

// Alterações ao perfil do prestador passam sempre por aprovação do admin
#[derive(Clone)]
pub struct ChangeRequestService {
    pool: PgPool,
    repo: AdminRepository,
    prestador_repo: PrestadorRepository,
    audit: AuditService,
}

impl ChangeRequestService {
    pub fn new(pool: PgPool, repo: AdminRepository, prestador_repo: PrestadorRepository, audit: AuditService) -> Self {
        Self { pool, repo, prestador_repo, audit }
    }

    pub async fn submit(&self, requester: &Profile, changes: &UpdatePrestadorPayload) -> Result<ChangeRequest, AppError> {
        changes.validate()?;
        if changes.is_empty() {
            return Err(AppError::BadRequest("Nada para alterar.".into()));
        }

        let prestador = self.prestador_repo.find_by_profile_id(requester.id).await?;
        let changes = serde_json::to_value(changes).map_err(anyhow::Error::from)?;

        let request = self
            .repo
            .create_change_request(prestador.id, requester.id, &changes)
            .await?;

        tracing::info!(request_id = %request.id, prestador_id = %prestador.id, "Pedido de alteração submetido");
        Ok(request)
    }

    pub async fn list(&self, filters: &ChangeRequestFilters) -> Result<Vec<ChangeRequest>, AppError> {
        self.repo.list_change_requests(filters).await
    }

    /// Aplica as alterações ao prestador na mesma transação da aprovação.
    pub async fn approve(&self, admin_id: Uuid, id: Uuid, payload: &ReviewChangeRequestPayload) -> Result<ChangeRequest, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;
        let request = self.repo.find_change_request_for_update(&mut *tx, id).await?;
        ensure_pending(&request, ChangeRequestStatus::Approved)?;

        let changes: UpdatePrestadorPayload = serde_json::from_value(request.changes.clone())
            .map_err(|e| AppError::BadRequest(format!("Pedido de alteração mal formado: {}", e)))?;
        self.prestador_repo
            .update_prestador(&mut *tx, request.prestador_id, &changes)
            .await?;

        let reviewed = self
            .repo
            .review_change_request(&mut *tx, id, ChangeRequestStatus::Approved, admin_id, payload.notes.as_deref())
            .await?;
        tx.commit().await?;

        self.audit
            .record(
                admin_id,
                "change_request.approved",
                "change_request",
                Some(id),
                json!({ "prestador_id": reviewed.prestador_id }),
            )
            .await;
        Ok(reviewed)
    }

    pub async fn reject(&self, admin_id: Uuid, id: Uuid, payload: &ReviewChangeRequestPayload) -> Result<ChangeRequest, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;
        let request = self.repo.find_change_request_for_update(&mut *tx, id).await?;
        ensure_pending(&request, ChangeRequestStatus::Rejected)?;

        let reviewed = self
            .repo
            .review_change_request(&mut *tx, id, ChangeRequestStatus::Rejected, admin_id, payload.notes.as_deref())
            .await?;
        tx.commit().await?;

        self.audit
            .record(
                admin_id,
                "change_request.rejected",
                "change_request",
                Some(id),
                json!({ "prestador_id": reviewed.prestador_id, "notes": payload.notes }),
            )
            .await;
        Ok(reviewed)
    }
}

fn ensure_pending(request: &ChangeRequest, next: ChangeRequestStatus) -> Result<(), AppError> {
    if request.status != ChangeRequestStatus::Pending {
        return Err(AppError::InvalidStatusTransition {
            from: status_name(request.status).to_string(),
            to: status_name(next).to_string(),
        });
    }
    Ok(())
}

fn status_name(status: ChangeRequestStatus) -> &'static str {
    match status {
        ChangeRequestStatus::Pending => "pending",
        ChangeRequestStatus::Approved => "approved",
        ChangeRequestStatus::Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(status: ChangeRequestStatus) -> ChangeRequest {
        ChangeRequest {
            id: Uuid::new_v4(),
            prestador_id: Uuid::new_v4(),
            requested_by: Uuid::new_v4(),
            changes: json!({ "bio": "Nova bio" }),
            status,
            reviewed_by: None,
            review_notes: None,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_pending_requests_can_be_reviewed() {
        assert!(ensure_pending(&request(ChangeRequestStatus::Pending), ChangeRequestStatus::Approved).is_ok());

        let err = ensure_pending(&request(ChangeRequestStatus::Rejected), ChangeRequestStatus::Approved).unwrap_err();
        match err {
            AppError::InvalidStatusTransition { from, to } => {
                assert_eq!(from, "rejected");
                assert_eq!(to, "approved");
            }
            other => panic!("erro inesperado: {:?}", other),
        }
    }

    #[test]
    fn stored_changes_read_back_as_update_payload() {
        let stored = json!({ "bio": "Psicóloga clínica", "specialties": ["burnout"] });
        let changes: UpdatePrestadorPayload = serde_json::from_value(stored).unwrap();
        assert_eq!(changes.bio.as_deref(), Some("Psicóloga clínica"));
        assert_eq!(changes.specialties, Some(vec!["burnout".to_string()]));
        assert!(changes.full_name.is_none());
    }
}
