// src/services/audit_service.rs

use serde_json::Value;
use uuid::Uuid;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    db::AdminRepository,
    models::admin::{AdminLog, AdminLogFilters},
};

#[derive(Clone)]
pub struct AuditService {
    repo: AdminRepository,
}

impl AuditService {
    pub fn new(repo: AdminRepository) -> Self {
        Self { repo }
    }

    /// Regista uma ação administrativa. Uma falha aqui só fica no log.
    pub async fn record(&self, admin_id: Uuid, action: &str, entity_type: &str, entity_id: Option<Uuid>, details: Value) {
        if let Err(e) = self.repo.insert_log(admin_id, action, entity_type, entity_id, &details).await {
            tracing::warn!(
                admin_id = %admin_id,
                action = action,
                error = %e,
                "Falha ao gravar admin log"
            );
        }
    }

    pub async fn list(&self, filters: &AdminLogFilters, page: Pagination) -> Result<Vec<AdminLog>, AppError> {
        self.repo.list_logs(filters, page).await
    }
}
