// src/services/user_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    db::{profile_repo::NewProfile, CompanyRepository, ProfileRepository},
    models::{
        auth::{Profile, UserRole},
        users::{CreateUserPayload, UpdateUserPayload, UserFilters},
    },
    services::{audit_service::AuditService, auth::hash_password},
};

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
    repo: ProfileRepository,
    company_repo: CompanyRepository,
    audit: AuditService,
}

impl UserService {
    pub fn new(pool: PgPool, repo: ProfileRepository, company_repo: CompanyRepository, audit: AuditService) -> Self {
        Self { pool, repo, company_repo, audit }
    }

    /// Criação privilegiada de contas (apenas admin).
    pub async fn create(&self, admin_id: Uuid, payload: &CreateUserPayload) -> Result<Profile, AppError> {
        payload.validate()?;
        check_role_company(payload.role, payload.company_id)?;

        if let Some(company_id) = payload.company_id {
            self.company_repo.find_by_id(&self.pool, company_id).await?;
        }

        let password_hash = hash_password(&payload.password).await?;
        let profile = self
            .repo
            .create_profile(
                &self.pool,
                NewProfile {
                    email: payload.email.trim(),
                    password_hash: &password_hash,
                    full_name: payload.full_name.trim(),
                    role: payload.role,
                    company_id: payload.company_id,
                    department: payload.department.as_deref(),
                    job_title: payload.job_title.as_deref(),
                },
            )
            .await?;

        self.audit
            .record(
                admin_id,
                "user.created",
                "profile",
                Some(profile.id),
                json!({ "email": profile.email, "role": profile.role.as_str(), "company_id": profile.company_id }),
            )
            .await;
        Ok(profile)
    }

    pub async fn list(&self, filters: &UserFilters, page: Pagination) -> Result<Vec<Profile>, AppError> {
        self.repo.list(filters, page).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Profile, AppError> {
        self.repo.find_by_id(id).await?.ok_or(AppError::NotFound("Utilizador"))
    }

    pub async fn update(&self, admin_id: Uuid, id: Uuid, payload: &UpdateUserPayload) -> Result<Profile, AppError> {
        payload.validate()?;

        let current = self.get(id).await?;
        let role = payload.role.unwrap_or(current.role);
        let company_id = payload.company_id.or(current.company_id);
        check_role_company(role, company_id)?;

        if let Some(company_id) = payload.company_id {
            self.company_repo.find_by_id(&self.pool, company_id).await?;
        }

        let profile = self.repo.update_profile(&self.pool, id, payload).await?;

        self.audit
            .record(
                admin_id,
                "user.updated",
                "profile",
                Some(id),
                json!({
                    "role": payload.role.map(|r| r.as_str()),
                    "company_id": payload.company_id,
                    "is_active": payload.is_active,
                }),
            )
            .await;
        Ok(profile)
    }
}

fn check_role_company(role: UserRole, company_id: Option<Uuid>) -> Result<(), AppError> {
    if role.requires_company() && company_id.is_none() {
        return Err(AppError::BadRequest(format!(
            "Utilizadores com o papel '{}' têm de pertencer a uma empresa.",
            role.as_str()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hr_and_users_need_a_company() {
        assert!(check_role_company(UserRole::Hr, None).is_err());
        assert!(check_role_company(UserRole::User, None).is_err());
        assert!(check_role_company(UserRole::User, Some(Uuid::new_v4())).is_ok());
    }

    #[test]
    fn admins_and_prestadores_do_not() {
        assert!(check_role_company(UserRole::Admin, None).is_ok());
        assert!(check_role_company(UserRole::Prestador, None).is_ok());
    }
}
