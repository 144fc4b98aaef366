// src/services/hr_service.rs

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProfileRepository, ReportRepository, SessionRepository},
    models::{
        auth::{Profile, UserRole},
        report::AdoptionReport,
        sessions::{SessionAllocation, SessionBalance, SetAllocationPayload},
        users::EmployeeSummary,
    },
    services::{report_service::build_adoption_report, session_service::SessionService},
};

// Visão do RH sobre os colaboradores da própria empresa
#[derive(Clone)]
pub struct HrService {
    pool: PgPool,
    profile_repo: ProfileRepository,
    session_repo: SessionRepository,
    report_repo: ReportRepository,
    session_service: SessionService,
}

impl HrService {
    pub fn new(
        pool: PgPool,
        profile_repo: ProfileRepository,
        session_repo: SessionRepository,
        report_repo: ReportRepository,
        session_service: SessionService,
    ) -> Self {
        Self { pool, profile_repo, session_repo, report_repo, session_service }
    }

    pub async fn list_employees(&self, company_id: Uuid, search: Option<&str>) -> Result<Vec<EmployeeSummary>, AppError> {
        let employees = self.profile_repo.list_company_employees(company_id, search).await?;
        let ids: Vec<Uuid> = employees.iter().map(|p| p.id).collect();
        let allocations = self.session_repo.active_allocations_for_users(&ids).await?;
        Ok(attach_balances(employees, allocations))
    }

    pub async fn set_employee_sessions(
        &self,
        actor: &Profile,
        company_id: Uuid,
        user_id: Uuid,
        payload: &SetAllocationPayload,
    ) -> Result<SessionAllocation, AppError> {
        self.find_employee(company_id, user_id).await?;
        self.session_service.set_allocation(actor, user_id, payload).await
    }

    pub async fn set_employee_status(&self, company_id: Uuid, user_id: Uuid, is_active: bool) -> Result<Profile, AppError> {
        self.find_employee(company_id, user_id).await?;
        let profile = self.profile_repo.set_active(&self.pool, user_id, is_active).await?;
        tracing::info!(user_id = %user_id, company_id = %company_id, is_active = is_active, "Estado do colaborador alterado");
        Ok(profile)
    }

    pub async fn adoption_report(&self, company_id: Uuid) -> Result<AdoptionReport, AppError> {
        let totals = self.report_repo.adoption_totals(&self.pool, company_id).await?;
        Ok(build_adoption_report(company_id, totals))
    }

    async fn find_employee(&self, company_id: Uuid, user_id: Uuid) -> Result<Profile, AppError> {
        self.profile_repo
            .find_by_id(user_id)
            .await?
            .filter(|p| p.role == UserRole::User && p.company_id == Some(company_id))
            .ok_or(AppError::NotFound("Colaborador"))
    }
}

fn attach_balances(employees: Vec<Profile>, allocations: Vec<SessionAllocation>) -> Vec<EmployeeSummary> {
    let mut by_user: HashMap<Uuid, Vec<SessionAllocation>> = HashMap::new();
    for allocation in allocations {
        by_user.entry(allocation.user_id).or_default().push(allocation);
    }

    employees
        .into_iter()
        .map(|profile| {
            let balance = by_user
                .get(&profile.id)
                .map(|rows| SessionBalance::from_allocations(rows))
                .unwrap_or_default();
            EmployeeSummary { profile, balance }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sessions::{tests::allocation, AllocationType};
    use chrono::Utc;

    fn employee() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "e@acme.pt".into(),
            password_hash: String::new(),
            full_name: "E".into(),
            role: UserRole::User,
            company_id: Some(Uuid::new_v4()),
            department: None,
            job_title: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn balances_are_matched_by_user() {
        let with_sessions = employee();
        let without_sessions = employee();

        let mut company = allocation(AllocationType::Company, 6, 2, true);
        company.user_id = with_sessions.id;
        let mut personal = allocation(AllocationType::Personal, 1, 0, true);
        personal.user_id = with_sessions.id;

        let summaries = attach_balances(vec![with_sessions.clone(), without_sessions.clone()], vec![company, personal]);

        assert_eq!(summaries[0].profile.id, with_sessions.id);
        assert_eq!(summaries[0].balance.total_remaining, 5);
        assert_eq!(summaries[1].profile.id, without_sessions.id);
        assert_eq!(summaries[1].balance.total_remaining, 0);
    }
}
