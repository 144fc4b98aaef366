// src/services/prestador_service.rs

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{prestador_repo::NewPrestador, profile_repo::NewProfile, PrestadorRepository, ProfileRepository},
    models::{
        auth::UserRole,
        prestador::{CreatePrestadorPayload, Prestador, PrestadorFilters, UpdatePrestadorPayload},
    },
    services::{audit_service::AuditService, auth::hash_password},
};

#[derive(Clone)]
pub struct PrestadorService {
    pool: PgPool,
    repo: PrestadorRepository,
    profile_repo: ProfileRepository,
    audit: AuditService,
}

impl PrestadorService {
    pub fn new(pool: PgPool, repo: PrestadorRepository, profile_repo: ProfileRepository, audit: AuditService) -> Self {
        Self { pool, repo, profile_repo, audit }
    }

    /// Cria o prestador e, se vier senha, o login ligado a ele.
    pub async fn create(&self, admin_id: Uuid, payload: &CreatePrestadorPayload) -> Result<Prestador, AppError> {
        payload.validate()?;

        let password_hash = match payload.password.as_deref() {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        let profile_id = match password_hash.as_deref() {
            Some(password_hash) => {
                let profile = self
                    .profile_repo
                    .create_profile(
                        &mut *tx,
                        NewProfile {
                            email: payload.email.trim(),
                            password_hash,
                            full_name: payload.full_name.trim(),
                            role: UserRole::Prestador,
                            company_id: None,
                            department: None,
                            job_title: None,
                        },
                    )
                    .await?;
                Some(profile.id)
            }
            None => None,
        };

        let prestador = self
            .repo
            .create_prestador(
                &mut *tx,
                NewPrestador {
                    profile_id,
                    full_name: payload.full_name.trim(),
                    email: payload.email.trim(),
                    pillars: &payload.pillars,
                    specialties: &payload.specialties,
                    license_number: payload.license_number.as_deref(),
                    bio: payload.bio.as_deref(),
                },
            )
            .await?;

        tx.commit().await?;

        self.audit
            .record(
                admin_id,
                "prestador.created",
                "prestador",
                Some(prestador.id),
                json!({ "email": prestador.email, "with_login": profile_id.is_some() }),
            )
            .await;
        Ok(prestador)
    }

    pub async fn list(&self, filters: &PrestadorFilters) -> Result<Vec<Prestador>, AppError> {
        self.repo.list(filters).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Prestador, AppError> {
        self.repo.find_by_id(&self.pool, id).await
    }

    pub async fn my_profile(&self, profile_id: Uuid) -> Result<Prestador, AppError> {
        self.repo.find_by_profile_id(profile_id).await
    }

    pub async fn update(&self, admin_id: Uuid, id: Uuid, payload: &UpdatePrestadorPayload) -> Result<Prestador, AppError> {
        payload.validate()?;
        if payload.is_empty() {
            return Err(AppError::BadRequest("Nada para alterar.".into()));
        }

        let prestador = self.repo.update_prestador(&self.pool, id, payload).await?;
        self.audit
            .record(admin_id, "prestador.updated", "prestador", Some(id), json!(payload))
            .await;
        Ok(prestador)
    }

    /// Desativar o prestador também bloqueia o login dele.
    pub async fn set_status(&self, admin_id: Uuid, id: Uuid, is_active: bool) -> Result<Prestador, AppError> {
        let mut tx = self.pool.begin().await?;
        let prestador = self.repo.set_active(&mut *tx, id, is_active).await?;
        if let Some(profile_id) = prestador.profile_id {
            self.profile_repo.set_active(&mut *tx, profile_id, is_active).await?;
        }
        tx.commit().await?;

        self.audit
            .record(admin_id, "prestador.status_changed", "prestador", Some(id), json!({ "is_active": is_active }))
            .await;
        Ok(prestador)
    }
}
