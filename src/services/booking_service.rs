// src/services/booking_service.rs

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::Pagination, error::AppError},
    db::{booking_repo::BookingScope, BookingRepository, FeedbackRepository, PrestadorRepository},
    models::{
        auth::{Profile, UserRole},
        booking::{
            Booking, BookingDetail, BookingFilters, BookingStatus, Feedback, FeedbackFilters, FeedbackPayload,
            RequestSessionPayload, SessionEffect,
        },
        pillar::Pillar,
        prestador::Prestador,
    },
    services::session_service::SessionService,
};

#[derive(Clone)]
pub struct BookingService {
    pool: PgPool,
    repo: BookingRepository,
    prestador_repo: PrestadorRepository,
    feedback_repo: FeedbackRepository,
    session_service: SessionService,
}

impl BookingService {
    pub fn new(
        pool: PgPool,
        repo: BookingRepository,
        prestador_repo: PrestadorRepository,
        feedback_repo: FeedbackRepository,
        session_service: SessionService,
    ) -> Self {
        Self { pool, repo, prestador_repo, feedback_repo, session_service }
    }

    /// Pedido de sessão pelo colaborador.
    pub async fn request_session(&self, user: &Profile, payload: &RequestSessionPayload) -> Result<Booking, AppError> {
        payload.validate()?;

        let prestador = self.prestador_repo.find_by_id(&self.pool, payload.prestador_id).await?;
        check_bookable(Utc::now(), payload.scheduled_at, &prestador, payload.pillar)?;

        let balance = self.session_service.balance(user.id).await?;
        let open = self.repo.count_open_for_user(&self.pool, user.id).await?;
        check_sessions_for_new_booking(balance.total_remaining, open)?;

        // O índice único apanha a corrida; aqui só damos a resposta cedo
        if self.repo.slot_taken(&self.pool, prestador.id, payload.scheduled_at).await? {
            return Err(AppError::SlotUnavailable);
        }

        let booking = self
            .repo
            .create_booking(&self.pool, user.id, user.company_id, payload)
            .await?;

        tracing::info!(
            booking_id = %booking.id,
            user_id = %user.id,
            prestador_id = %prestador.id,
            pillar = booking.pillar.as_str(),
            "Sessão pedida"
        );
        Ok(booking)
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        filters: &BookingFilters,
        page: Pagination,
    ) -> Result<Vec<BookingDetail>, AppError> {
        let scope = BookingScope { user_id: Some(user_id), ..Default::default() };
        self.repo.list_details(filters, scope, page).await
    }

    pub async fn list_for_prestador(
        &self,
        profile: &Profile,
        filters: &BookingFilters,
        page: Pagination,
    ) -> Result<Vec<BookingDetail>, AppError> {
        let prestador = self.prestador_repo.find_by_profile_id(profile.id).await?;
        let scope = BookingScope { prestador_id: Some(prestador.id), ..Default::default() };
        self.repo.list_details(filters, scope, page).await
    }

    pub async fn list_all(&self, filters: &BookingFilters, page: Pagination) -> Result<Vec<BookingDetail>, AppError> {
        self.repo.list_details(filters, BookingScope::default(), page).await
    }

    /// Muda o estado e aplica o efeito no saldo na mesma transação.
    pub async fn update_status(&self, actor: &Profile, booking_id: Uuid, next: BookingStatus) -> Result<Booking, AppError> {
        let actor_prestador_id = match actor.role {
            UserRole::Prestador => Some(self.prestador_repo.find_by_profile_id(actor.id).await?.id),
            _ => None,
        };

        let mut tx = self.pool.begin().await?;
        let booking = self.repo.find_for_update(&mut *tx, booking_id).await?;

        authorize_transition(actor, actor_prestador_id, &booking, next)?;

        if !booking.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: booking.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        match booking.status.session_effect(next) {
            SessionEffect::Deduct => {
                if let Some(usage) = self.session_service.deduct_for_booking(&mut *tx, &booking).await? {
                    self.repo.set_session_usage(&mut *tx, booking.id, usage.id).await?;
                }
            }
            SessionEffect::Refund => {
                self.session_service.refund_for_booking(&mut *tx, &booking).await?;
            }
            SessionEffect::None => {}
        }

        let updated = self.repo.update_status(&mut *tx, booking.id, next).await?;
        tx.commit().await?;

        tracing::info!(
            booking_id = %updated.id,
            actor_id = %actor.id,
            from = booking.status.as_str(),
            to = next.as_str(),
            "Estado da marcação atualizado"
        );
        Ok(updated)
    }

    pub async fn submit_feedback(&self, user: &Profile, booking_id: Uuid, payload: &FeedbackPayload) -> Result<Feedback, AppError> {
        payload.validate()?;

        let booking = self.repo.find_by_id(&self.pool, booking_id).await?;
        if booking.user_id != user.id {
            return Err(AppError::NotFound("Marcação"));
        }
        if booking.status != BookingStatus::Completed {
            return Err(AppError::BadRequest("Só é possível avaliar sessões concluídas.".into()));
        }

        self.feedback_repo.create_feedback(&self.pool, &booking, payload).await
    }

    pub async fn list_feedback(&self, filters: &FeedbackFilters, page: Pagination) -> Result<Vec<Feedback>, AppError> {
        self.feedback_repo.list(filters, page).await
    }

    pub async fn feedback_for_prestador(&self, profile: &Profile) -> Result<Vec<Feedback>, AppError> {
        let prestador = self.prestador_repo.find_by_profile_id(profile.id).await?;
        self.feedback_repo.for_prestador(prestador.id).await
    }
}

fn check_bookable(now: DateTime<Utc>, scheduled_at: DateTime<Utc>, prestador: &Prestador, pillar: Pillar) -> Result<(), AppError> {
    if scheduled_at <= now {
        return Err(AppError::BadRequest("A sessão tem de ser marcada para o futuro.".into()));
    }
    if !prestador.is_active {
        return Err(AppError::BadRequest("O especialista não está disponível.".into()));
    }
    if !prestador.serves(pillar) {
        return Err(AppError::BadRequest(format!(
            "O especialista não atende no pilar '{}'.",
            pillar.label()
        )));
    }
    Ok(())
}

// As marcações em aberto já têm uma sessão reservada
fn check_sessions_for_new_booking(total_remaining: i32, open_bookings: i64) -> Result<(), AppError> {
    if i64::from(total_remaining) - open_bookings <= 0 {
        return Err(AppError::NoSessionsAvailable);
    }
    Ok(())
}

// Admin: tudo. Prestador: as suas marcações. Colaborador: só cancelar as suas, se não concluídas.
fn authorize_transition(
    actor: &Profile,
    actor_prestador_id: Option<Uuid>,
    booking: &Booking,
    next: BookingStatus,
) -> Result<(), AppError> {
    match actor.role {
        UserRole::Admin => Ok(()),
        UserRole::Prestador if actor_prestador_id == Some(booking.prestador_id) => Ok(()),
        UserRole::User if booking.user_id == actor.id => {
            if next != BookingStatus::Cancelled {
                return Err(AppError::Forbidden("O colaborador só pode cancelar marcações.".into()));
            }
            if booking.status == BookingStatus::Completed {
                return Err(AppError::Forbidden("Uma sessão concluída não pode ser cancelada pelo colaborador.".into()));
            }
            Ok(())
        }
        UserRole::Prestador | UserRole::User => Err(AppError::NotFound("Marcação")),
        UserRole::Hr => Err(AppError::Forbidden("O RH não gere marcações.".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile(role: UserRole) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "p@x.pt".into(),
            password_hash: String::new(),
            full_name: "P".into(),
            role,
            company_id: None,
            department: None,
            job_title: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn prestador(active: bool, pillars: Vec<Pillar>) -> Prestador {
        Prestador {
            id: Uuid::new_v4(),
            profile_id: None,
            full_name: "Dra. Rita".into(),
            email: "rita@x.pt".into(),
            pillars,
            specialties: vec![],
            license_number: None,
            bio: None,
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn booking(user_id: Uuid, prestador_id: Uuid, status: BookingStatus) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id,
            prestador_id,
            company_id: None,
            pillar: Pillar::SaudeMental,
            scheduled_at: Utc::now(),
            status,
            notes: None,
            session_usage_id: None,
            completed_at: None,
            cancelled_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn booking_must_be_in_the_future() {
        let now = Utc::now();
        let p = prestador(true, vec![Pillar::SaudeMental]);
        assert!(check_bookable(now, now + Duration::hours(1), &p, Pillar::SaudeMental).is_ok());
        assert!(matches!(
            check_bookable(now, now - Duration::minutes(1), &p, Pillar::SaudeMental),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn prestador_must_be_active_and_serve_pillar() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        let inactive = prestador(false, vec![Pillar::SaudeMental]);
        let other_pillar = prestador(true, vec![Pillar::AssistenciaJuridica]);
        assert!(check_bookable(now, later, &inactive, Pillar::SaudeMental).is_err());
        assert!(check_bookable(now, later, &other_pillar, Pillar::SaudeMental).is_err());
    }

    #[test]
    fn open_bookings_reserve_sessions() {
        assert!(check_sessions_for_new_booking(2, 1).is_ok());
        assert!(matches!(check_sessions_for_new_booking(1, 1), Err(AppError::NoSessionsAvailable)));
        assert!(matches!(check_sessions_for_new_booking(0, 0), Err(AppError::NoSessionsAvailable)));
    }

    #[test]
    fn user_may_only_cancel_own_open_booking() {
        let user = profile(UserRole::User);
        let prestador_id = Uuid::new_v4();

        let open = booking(user.id, prestador_id, BookingStatus::Scheduled);
        assert!(authorize_transition(&user, None, &open, BookingStatus::Cancelled).is_ok());
        assert!(matches!(
            authorize_transition(&user, None, &open, BookingStatus::Completed),
            Err(AppError::Forbidden(_))
        ));

        let done = booking(user.id, prestador_id, BookingStatus::Completed);
        assert!(authorize_transition(&user, None, &done, BookingStatus::Cancelled).is_err());

        let someone_else = booking(Uuid::new_v4(), prestador_id, BookingStatus::Scheduled);
        assert!(matches!(
            authorize_transition(&user, None, &someone_else, BookingStatus::Cancelled),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn prestador_only_manages_own_bookings() {
        let actor = profile(UserRole::Prestador);
        let own_id = Uuid::new_v4();
        let own = booking(Uuid::new_v4(), own_id, BookingStatus::Confirmed);
        let other = booking(Uuid::new_v4(), Uuid::new_v4(), BookingStatus::Confirmed);

        assert!(authorize_transition(&actor, Some(own_id), &own, BookingStatus::Completed).is_ok());
        assert!(authorize_transition(&actor, Some(own_id), &other, BookingStatus::Completed).is_err());
    }

    #[test]
    fn admin_and_hr() {
        let b = booking(Uuid::new_v4(), Uuid::new_v4(), BookingStatus::Completed);
        assert!(authorize_transition(&profile(UserRole::Admin), None, &b, BookingStatus::Cancelled).is_ok());
        assert!(matches!(
            authorize_transition(&profile(UserRole::Hr), None, &b, BookingStatus::Cancelled),
            Err(AppError::Forbidden(_))
        ));
    }
}

#[cfg(all(test, feature = "db-tests"))]
mod db_tests {
    use sqlx::PgPool;

    use crate::{
        common::{error::AppError, test_support as fixture},
        models::{auth::UserRole, booking::BookingStatus, sessions::AllocationType},
    };

    #[sqlx::test]
    async fn cancelled_completion_returns_the_session_and_cannot_complete_again(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        let admin = fixture::profile(&pool, UserRole::Admin, None).await;
        let user = fixture::profile(&pool, UserRole::User, Some(company.id)).await;
        fixture::allocation(&pool, &user, AllocationType::Company, 3, 0).await;
        let prestador_id = fixture::prestador(&pool).await;
        let booking = fixture::confirmed_booking(&pool, &user, prestador_id, 2).await;

        let completed = state
            .booking_service
            .update_status(&admin, booking.id, BookingStatus::Completed)
            .await
            .unwrap();
        assert!(completed.session_usage_id.is_some());
        assert_eq!(fixture::company_sessions_used(&pool, company.id).await, 1);

        let cancelled = state
            .booking_service
            .update_status(&admin, booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(fixture::company_sessions_used(&pool, company.id).await, 0);

        let active = fixture::active_allocations(&pool, user.id).await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].sessions_used, 0);

        let refunded: bool = sqlx::query_scalar("SELECT refunded_at IS NOT NULL FROM session_usages WHERE booking_id = $1")
            .bind(booking.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(refunded);

        let again = state
            .booking_service
            .update_status(&admin, booking.id, BookingStatus::Completed)
            .await;
        assert!(matches!(again, Err(AppError::InvalidStatusTransition { .. })));
        assert_eq!(fixture::company_sessions_used(&pool, company.id).await, 0);
    }

    #[sqlx::test]
    async fn completing_twice_consumes_a_single_session(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        let admin = fixture::profile(&pool, UserRole::Admin, None).await;
        let user = fixture::profile(&pool, UserRole::User, Some(company.id)).await;
        fixture::allocation(&pool, &user, AllocationType::Company, 3, 0).await;
        let prestador_id = fixture::prestador(&pool).await;
        let booking = fixture::confirmed_booking(&pool, &user, prestador_id, 2).await;

        state
            .booking_service
            .update_status(&admin, booking.id, BookingStatus::Completed)
            .await
            .unwrap();
        let second = state
            .booking_service
            .update_status(&admin, booking.id, BookingStatus::Completed)
            .await;
        assert!(matches!(second, Err(AppError::InvalidStatusTransition { .. })));

        let usages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_usages WHERE booking_id = $1")
            .bind(booking.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(usages, 1);
        assert_eq!(fixture::active_allocations(&pool, user.id).await[0].sessions_used, 1);
        assert_eq!(fixture::company_sessions_used(&pool, company.id).await, 1);
    }

    #[sqlx::test]
    async fn concurrent_completions_of_one_user_do_not_lose_updates(pool: PgPool) {
        let state = fixture::state(pool.clone());
        let company = fixture::company(&pool, 10).await;
        let admin = fixture::profile(&pool, UserRole::Admin, None).await;
        let user = fixture::profile(&pool, UserRole::User, Some(company.id)).await;
        fixture::allocation(&pool, &user, AllocationType::Company, 2, 0).await;
        fixture::allocation(&pool, &user, AllocationType::Personal, 1, 0).await;
        let prestador_id = fixture::prestador(&pool).await;
        let first = fixture::confirmed_booking(&pool, &user, prestador_id, 2).await;
        let second = fixture::confirmed_booking(&pool, &user, prestador_id, 3).await;

        let (a, b) = tokio::join!(
            state.booking_service.update_status(&admin, first.id, BookingStatus::Completed),
            state.booking_service.update_status(&admin, second.id, BookingStatus::Completed),
        );
        a.unwrap();
        b.unwrap();

        let active = fixture::active_allocations(&pool, user.id).await;
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].allocation_type, AllocationType::Company);
        assert_eq!(active[0].sessions_used, 2);
        assert_eq!(active[1].allocation_type, AllocationType::Personal);
        assert_eq!(active[1].sessions_used, 0);
        assert_eq!(fixture::company_sessions_used(&pool, company.id).await, 2);
    }
}
