// src/services/company_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CompanyRepository, ProfileRepository},
    models::company::{
        AddCompanySessionsPayload, Company, CompanyFilters, CompanyStatusChange, CreateCompanyPayload,
        UpdateCompanyPayload,
    },
    services::audit_service::AuditService,
};

#[derive(Clone)]
pub struct CompanyService {
    pool: PgPool,
    repo: CompanyRepository,
    profile_repo: ProfileRepository,
    audit: AuditService,
}

impl CompanyService {
    pub fn new(pool: PgPool, repo: CompanyRepository, profile_repo: ProfileRepository, audit: AuditService) -> Self {
        Self { pool, repo, profile_repo, audit }
    }

    pub async fn create(&self, admin_id: Uuid, payload: &CreateCompanyPayload) -> Result<Company, AppError> {
        payload.validate()?;

        let company = self.repo.create_company(&self.pool, payload).await?;
        self.audit
            .record(admin_id, "company.created", "company", Some(company.id), json!({ "name": company.name }))
            .await;
        Ok(company)
    }

    pub async fn list(&self, filters: &CompanyFilters) -> Result<Vec<Company>, AppError> {
        self.repo.list(filters).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Company, AppError> {
        self.repo.find_by_id(&self.pool, id).await
    }

    pub async fn update(&self, admin_id: Uuid, id: Uuid, payload: &UpdateCompanyPayload) -> Result<Company, AppError> {
        payload.validate()?;

        let mut tx = self.pool.begin().await?;
        self.repo.find_for_update(&mut *tx, id).await?;

        if let Some(total) = payload.sessions_allocated {
            let committed = self.repo.committed_sessions(&mut *tx, id, None).await?;
            check_pool_covers_commitments(total, committed)?;
        }

        let company = self.repo.update_company(&mut *tx, id, payload).await?;
        tx.commit().await?;

        self.audit
            .record(
                admin_id,
                "company.updated",
                "company",
                Some(id),
                json!({ "name": payload.name, "plan_type": payload.plan_type, "sessions_allocated": payload.sessions_allocated }),
            )
            .await;
        Ok(company)
    }

    /// Ativa/desativa a empresa e todos os perfis não-admin dela, numa transação.
    pub async fn set_status(&self, admin_id: Uuid, id: Uuid, is_active: bool) -> Result<CompanyStatusChange, AppError> {
        let mut tx = self.pool.begin().await?;

        self.repo.find_for_update(&mut *tx, id).await?;
        let company = self.repo.set_active(&mut *tx, id, is_active).await?;
        let affected_profiles = self
            .profile_repo
            .set_company_profiles_active(&mut *tx, id, is_active)
            .await?;

        tx.commit().await?;

        tracing::info!(
            company_id = %id,
            is_active = is_active,
            affected_profiles = affected_profiles,
            "Estado da empresa alterado"
        );
        self.audit
            .record(
                admin_id,
                "company.status_changed",
                "company",
                Some(id),
                json!({ "is_active": is_active, "affected_profiles": affected_profiles }),
            )
            .await;

        Ok(CompanyStatusChange { company, affected_profiles })
    }

    pub async fn add_sessions(&self, admin_id: Uuid, id: Uuid, payload: &AddCompanySessionsPayload) -> Result<Company, AppError> {
        payload.validate()?;

        let company = self.repo.add_sessions(&self.pool, id, payload.amount).await?;
        self.audit
            .record(
                admin_id,
                "company.sessions_added",
                "company",
                Some(id),
                json!({ "amount": payload.amount, "sessions_allocated": company.sessions_allocated }),
            )
            .await;
        Ok(company)
    }
}

// O total da empresa nunca fica abaixo do que já foi atribuído a colaboradores
fn check_pool_covers_commitments(total: i32, committed: i64) -> Result<(), AppError> {
    if i64::from(total) < committed {
        return Err(AppError::BadRequest(format!(
            "O total de sessões não pode ficar abaixo das {} já atribuídas a colaboradores.",
            committed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_may_shrink_down_to_commitments() {
        assert!(check_pool_covers_commitments(40, 40).is_ok());
        assert!(check_pool_covers_commitments(100, 40).is_ok());
    }

    #[test]
    fn pool_below_commitments_is_rejected() {
        let err = check_pool_covers_commitments(30, 40).unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("40")),
            other => panic!("erro inesperado: {:?}", other),
        }
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use sqlx::PgPool;

    use crate::{common::test_support as fixture, models::auth::UserRole};

    async fn is_active(pool: &PgPool, profile_id: uuid::Uuid) -> bool {
        sqlx::query_scalar("SELECT is_active FROM profiles WHERE id = $1")
            .bind(profile_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn deactivation_cascades_to_non_admin_profiles_of_the_company(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        let other = fixture::company(&pool, 10).await;
        let admin = fixture::profile(&pool, UserRole::Admin, Some(company.id)).await;
        let hr = fixture::profile(&pool, UserRole::Hr, Some(company.id)).await;
        let ana = fixture::profile(&pool, UserRole::User, Some(company.id)).await;
        let rui = fixture::profile(&pool, UserRole::User, Some(company.id)).await;
        let outsider = fixture::profile(&pool, UserRole::User, Some(other.id)).await;

        let change = state.company_service.set_status(admin.id, company.id, false).await.unwrap();
        assert!(!change.company.is_active);
        assert_eq!(change.affected_profiles, 3);

        for id in [hr.id, ana.id, rui.id] {
            assert!(!is_active(&pool, id).await);
        }
        assert!(is_active(&pool, admin.id).await);
        assert!(is_active(&pool, outsider.id).await);

        let change = state.company_service.set_status(admin.id, company.id, true).await.unwrap();
        assert_eq!(change.affected_profiles, 3);
        assert!(is_active(&pool, ana.id).await);
    }
}
