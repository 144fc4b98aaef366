// src/services/session_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{session_repo::NewAllocation, CompanyRepository, ProfileRepository, SessionRepository},
    models::{
        auth::{Profile, UserRole},
        booking::Booking,
        sessions::{
            pick_allocation_for_deduction, AllocationType, SessionAllocation, SessionBalance, SessionUsage,
            SetAllocationPayload,
        },
    },
};

const REASON_MANUAL: &str = "manual_adjustment";
const REASON_BOOKING_COMPLETED: &str = "booking_completed";
const REASON_BOOKING_REFUND: &str = "booking_refund";

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    repo: SessionRepository,
    company_repo: CompanyRepository,
    profile_repo: ProfileRepository,
}

impl SessionService {
    pub fn new(
        pool: PgPool,
        repo: SessionRepository,
        company_repo: CompanyRepository,
        profile_repo: ProfileRepository,
    ) -> Self {
        Self { pool, repo, company_repo, profile_repo }
    }

    pub async fn balance(&self, user_id: Uuid) -> Result<SessionBalance, AppError> {
        let allocations = self.repo.active_allocations(&self.pool, user_id).await?;
        Ok(SessionBalance::from_allocations(&allocations))
    }

    pub async fn history(&self, user_id: Uuid) -> Result<Vec<SessionAllocation>, AppError> {
        self.repo.allocation_history(user_id).await
    }

    /// Ajuste manual. O RH só mexe na alocação `company` dos seus colaboradores.
    pub async fn set_allocation(
        &self,
        actor: &Profile,
        user_id: Uuid,
        payload: &SetAllocationPayload,
    ) -> Result<SessionAllocation, AppError> {
        payload.validate()?;

        let target = self
            .profile_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound("Utilizador"))?;

        check_actor_may_allocate(actor, &target, payload.allocation_type)?;

        let reason = payload
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(REASON_MANUAL);

        let mut tx = self.pool.begin().await?;
        let allocation = self
            .apply_allocation(
                &mut *tx,
                &target,
                payload.allocation_type,
                payload.sessions_allocated,
                reason,
                Some(actor.id),
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %target.id,
            actor_id = %actor.id,
            allocation_type = payload.allocation_type.as_str(),
            sessions_allocated = allocation.sessions_allocated,
            "Alocação de sessões atualizada"
        );
        Ok(allocation)
    }

    /// Substitui a alocação ativa do tipo pedido, dentro da transação de quem chama.
    /// As alocações `company` ficam limitadas à cota da empresa.
    pub(crate) async fn apply_allocation(
        &self,
        conn: &mut PgConnection,
        target: &Profile,
        allocation_type: AllocationType,
        sessions_allocated: i32,
        reason: &str,
        created_by: Option<Uuid>,
    ) -> Result<SessionAllocation, AppError> {
        let company_id = match allocation_type {
            AllocationType::Company => Some(target.company_id.ok_or_else(|| {
                AppError::BadRequest("O utilizador não pertence a nenhuma empresa.".into())
            })?),
            AllocationType::Personal => None,
        };

        let active = self.repo.lock_active_allocations(&mut *conn, target.id).await?;
        let current = active.iter().find(|a| a.allocation_type == allocation_type);

        if let Some(company_id) = company_id {
            let company = self.company_repo.find_for_update(&mut *conn, company_id).await?;
            if !company.is_active {
                return Err(AppError::CompanyInactive);
            }
            let committed = self
                .company_repo
                .committed_sessions(&mut *conn, company_id, Some(target.id))
                .await?;
            check_company_quota(company.sessions_allocated, committed, sessions_allocated)?;
        }

        if let Some(current) = current {
            self.repo.deactivate(&mut *conn, current.id).await?;
        }

        self.repo
            .insert_allocation(
                &mut *conn,
                NewAllocation {
                    user_id: target.id,
                    company_id: company_id.or(current.and_then(|c| c.company_id)),
                    allocation_type,
                    sessions_allocated,
                    sessions_used: current.map(|c| c.sessions_used).unwrap_or(0),
                    previous_allocation_id: current.map(|c| c.id),
                    reason,
                    created_by,
                },
            )
            .await
    }

    /// Consome uma sessão pela marcação concluída. `Ok(None)` se já tinha sido descontada.
    pub(crate) async fn deduct_for_booking(
        &self,
        conn: &mut PgConnection,
        booking: &Booking,
    ) -> Result<Option<SessionUsage>, AppError> {
        if booking.session_usage_id.is_some() {
            tracing::debug!(booking_id = %booking.id, "Sessão já descontada para esta marcação");
            return Ok(None);
        }

        let allocations = self.repo.lock_active_allocations(&mut *conn, booking.user_id).await?;
        let source = pick_allocation_for_deduction(&allocations).ok_or(AppError::NoSessionsAvailable)?;

        let updated = self
            .replace_with_usage(&mut *conn, source, source.sessions_used + 1, REASON_BOOKING_COMPLETED)
            .await?;

        if let (AllocationType::Company, Some(company_id)) = (updated.allocation_type, updated.company_id) {
            self.company_repo.adjust_sessions_used(&mut *conn, company_id, 1).await?;
        }

        let usage = self.repo.insert_usage(&mut *conn, booking.id, &updated).await?;

        tracing::info!(
            booking_id = %booking.id,
            user_id = %booking.user_id,
            allocation_type = updated.allocation_type.as_str(),
            remaining = updated.remaining(),
            "Sessão descontada"
        );
        Ok(Some(usage))
    }

    /// Devolve a sessão de uma marcação concluída que foi cancelada. `Ok(false)` se não havia nada a devolver.
    pub(crate) async fn refund_for_booking(&self, conn: &mut PgConnection, booking: &Booking) -> Result<bool, AppError> {
        let Some(usage_id) = booking.session_usage_id else {
            return Ok(false);
        };

        let usage = self.repo.find_usage_for_update(&mut *conn, usage_id).await?;
        if usage.refunded_at.is_some() {
            return Ok(false);
        }

        let allocations = self.repo.lock_active_allocations(&mut *conn, usage.user_id).await?;
        let current = allocations
            .iter()
            .find(|a| a.allocation_type == usage.allocation_type)
            .ok_or_else(|| {
                AppError::InternalServerError(anyhow::anyhow!(
                    "sem alocação '{}' ativa para devolver a sessão da marcação {}",
                    usage.allocation_type.as_str(),
                    booking.id
                ))
            })?;
        self.replace_with_usage(&mut *conn, current, (current.sessions_used - 1).max(0), REASON_BOOKING_REFUND)
            .await?;

        if let (AllocationType::Company, Some(company_id)) = (usage.allocation_type, usage.company_id) {
            self.company_repo.adjust_sessions_used(&mut *conn, company_id, -1).await?;
        }

        self.repo.mark_usage_refunded(&mut *conn, usage.id).await?;

        tracing::info!(booking_id = %booking.id, user_id = %usage.user_id, "Sessão devolvida");
        Ok(true)
    }

    async fn replace_with_usage(
        &self,
        conn: &mut PgConnection,
        current: &SessionAllocation,
        sessions_used: i32,
        reason: &str,
    ) -> Result<SessionAllocation, AppError> {
        self.repo.deactivate(&mut *conn, current.id).await?;
        self.repo
            .insert_allocation(
                &mut *conn,
                NewAllocation {
                    user_id: current.user_id,
                    company_id: current.company_id,
                    allocation_type: current.allocation_type,
                    sessions_allocated: current.sessions_allocated,
                    sessions_used,
                    previous_allocation_id: Some(current.id),
                    reason,
                    created_by: None,
                },
            )
            .await
    }
}

fn check_actor_may_allocate(actor: &Profile, target: &Profile, kind: AllocationType) -> Result<(), AppError> {
    if target.role != UserRole::User {
        return Err(AppError::BadRequest("Só colaboradores recebem sessões.".into()));
    }
    match actor.role {
        UserRole::Admin => Ok(()),
        UserRole::Hr => {
            if kind != AllocationType::Company {
                return Err(AppError::Forbidden("O RH só gere sessões da empresa.".into()));
            }
            if actor.company_id.is_none() || actor.company_id != target.company_id {
                return Err(AppError::Forbidden("Colaborador de outra empresa.".into()));
            }
            Ok(())
        }
        _ => Err(AppError::Forbidden("Sem permissão para alocar sessões.".into())),
    }
}

/// `committed` já exclui a alocação que vai ser substituída.
fn check_company_quota(pool_total: i32, committed: i64, requested: i32) -> Result<(), AppError> {
    let available = (i64::from(pool_total) - committed).max(0);
    if i64::from(requested) > available {
        return Err(AppError::CompanyQuotaExceeded {
            available: i32::try_from(available).unwrap_or(i32::MAX),
            requested,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(role: UserRole, company_id: Option<Uuid>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "x@y.pt".into(),
            password_hash: String::new(),
            full_name: "X".into(),
            role,
            company_id,
            department: None,
            job_title: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn quota_allows_up_to_available() {
        assert!(check_company_quota(100, 90, 10).is_ok());
        assert!(check_company_quota(100, 0, 0).is_ok());
    }

    #[test]
    fn quota_rejects_above_available() {
        let err = check_company_quota(100, 95, 10).unwrap_err();
        assert!(matches!(err, AppError::CompanyQuotaExceeded { available: 5, requested: 10 }));
    }

    #[test]
    fn overcommitted_pool_reports_zero_available() {
        let err = check_company_quota(10, 20, 1).unwrap_err();
        assert!(matches!(err, AppError::CompanyQuotaExceeded { available: 0, requested: 1 }));
    }

    #[test]
    fn hr_is_limited_to_own_company_and_company_sessions() {
        let company = Some(Uuid::new_v4());
        let hr = profile(UserRole::Hr, company);
        let employee = profile(UserRole::User, company);
        let outsider = profile(UserRole::User, Some(Uuid::new_v4()));

        assert!(check_actor_may_allocate(&hr, &employee, AllocationType::Company).is_ok());
        assert!(matches!(
            check_actor_may_allocate(&hr, &employee, AllocationType::Personal),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_actor_may_allocate(&hr, &outsider, AllocationType::Company),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_may_grant_personal_sessions_but_not_to_staff() {
        let admin = profile(UserRole::Admin, None);
        let employee = profile(UserRole::User, Some(Uuid::new_v4()));
        let hr = profile(UserRole::Hr, employee.company_id);

        assert!(check_actor_may_allocate(&admin, &employee, AllocationType::Personal).is_ok());
        assert!(matches!(
            check_actor_may_allocate(&admin, &hr, AllocationType::Company),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn prestador_cannot_allocate() {
        let prestador = profile(UserRole::Prestador, None);
        let employee = profile(UserRole::User, Some(Uuid::new_v4()));
        assert!(matches!(
            check_actor_may_allocate(&prestador, &employee, AllocationType::Company),
            Err(AppError::Forbidden(_))
        ));
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use sqlx::PgPool;

    use crate::{
        common::test_support as fixture,
        models::{auth::UserRole, sessions::AllocationType},
    };

    #[sqlx::test]
    async fn exhausted_company_allocation_falls_back_to_personal(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        let user = fixture::profile(&pool, UserRole::User, Some(company.id)).await;
        fixture::allocation(&pool, &user, AllocationType::Company, 1, 1).await;
        fixture::allocation(&pool, &user, AllocationType::Personal, 2, 0).await;
        let prestador_id = fixture::prestador(&pool).await;
        let booking = fixture::confirmed_booking(&pool, &user, prestador_id, 2).await;

        let mut tx = pool.begin().await.unwrap();
        let usage = state
            .session_service
            .deduct_for_booking(&mut *tx, &booking)
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(usage.allocation_type, AllocationType::Personal);
        let active = fixture::active_allocations(&pool, user.id).await;
        assert_eq!(active[0].sessions_used, 1);
        assert_eq!(active[1].sessions_used, 1);
        assert_eq!(fixture::company_sessions_used(&pool, company.id).await, 1);

        let balance = state.session_service.balance(user.id).await.unwrap();
        assert_eq!(balance.company.remaining, 0);
        assert_eq!(balance.personal.remaining, 1);
    }

    #[sqlx::test]
    async fn deduct_and_refund_apply_once_per_booking(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let user = fixture::profile(&pool, UserRole::User, None).await;
        fixture::allocation(&pool, &user, AllocationType::Personal, 2, 0).await;
        let prestador_id = fixture::prestador(&pool).await;
        let mut booking = fixture::confirmed_booking(&pool, &user, prestador_id, 2).await;

        let mut tx = pool.begin().await.unwrap();
        let usage = state
            .session_service
            .deduct_for_booking(&mut *tx, &booking)
            .await
            .unwrap()
            .unwrap();
        booking.session_usage_id = Some(usage.id);

        let repeated = state.session_service.deduct_for_booking(&mut *tx, &booking).await.unwrap();
        assert!(repeated.is_none());

        assert!(state.session_service.refund_for_booking(&mut *tx, &booking).await.unwrap());
        assert!(!state.session_service.refund_for_booking(&mut *tx, &booking).await.unwrap());
        tx.commit().await.unwrap();

        let active = fixture::active_allocations(&pool, user.id).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].sessions_used, 0);
    }

    #[sqlx::test]
    async fn refund_without_an_active_allocation_is_an_error(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let user = fixture::profile(&pool, UserRole::User, None).await;
        let allocation = fixture::allocation(&pool, &user, AllocationType::Personal, 1, 0).await;
        let prestador_id = fixture::prestador(&pool).await;
        let mut booking = fixture::confirmed_booking(&pool, &user, prestador_id, 2).await;

        let mut tx = pool.begin().await.unwrap();
        let usage = state
            .session_service
            .deduct_for_booking(&mut *tx, &booking)
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();
        booking.session_usage_id = Some(usage.id);

        sqlx::query("UPDATE session_allocations SET is_active = FALSE WHERE user_id = $1")
            .bind(allocation.user_id)
            .execute(&pool)
            .await
            .unwrap();

        let mut tx = pool.begin().await.unwrap();
        assert!(state.session_service.refund_for_booking(&mut *tx, &booking).await.is_err());
        tx.rollback().await.unwrap();

        let refunded: bool = sqlx::query_scalar("SELECT refunded_at IS NOT NULL FROM session_usages WHERE id = $1")
            .bind(usage.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(!refunded);
    }
}
