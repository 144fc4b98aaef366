// src/middleware/company.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    middleware::auth::AuthenticatedUser,
    models::auth::{Profile, UserRole},
};

// Cabeçalho usado pelo admin para agir sobre uma empresa
const COMPANY_ID_HEADER: &str = "x-company-id";

/// Empresa sobre a qual o pedido atua.
/// RH fica sempre preso à própria empresa; o admin escolhe pelo cabeçalho `X-Company-ID`.
#[derive(Debug, Clone, Copy)]
pub struct CompanyScope(pub Uuid);

impl<S> FromRequestParts<S> for CompanyScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        let header = parts
            .headers
            .get(COMPANY_ID_HEADER)
            .map(|value| value.to_str().unwrap_or_default());

        Ok(resolve_scope(&user.0, header)?)
    }
}

fn resolve_scope(profile: &Profile, header: Option<&str>) -> Result<CompanyScope, AppError> {
    match profile.role {
        UserRole::Hr => profile
            .company_id
            .map(CompanyScope)
            .ok_or_else(|| AppError::Forbidden("Conta de RH sem empresa associada.".into())),
        UserRole::Admin => {
            let value = header
                .ok_or_else(|| AppError::BadRequest("O cabeçalho X-Company-ID é obrigatório.".into()))?;
            Uuid::parse_str(value.trim())
                .map(CompanyScope)
                .map_err(|_| AppError::BadRequest("Cabeçalho X-Company-ID inválido (não é um UUID).".into()))
        }
        _ => Err(AppError::Forbidden("Apenas RH ou admin atuam sobre uma empresa.".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(role: UserRole, company_id: Option<Uuid>) -> Profile {
        Profile {
            id: Uuid::new_v4(),
            email: "x@acme.pt".into(),
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
    fn hr_ignores_the_header() {
        let own = Uuid::new_v4();
        let other = Uuid::new_v4().to_string();
        let scope = resolve_scope(&profile(UserRole::Hr, Some(own)), Some(&other)).unwrap();
        assert_eq!(scope.0, own);
    }

    #[test]
    fn admin_needs_a_valid_header() {
        let admin = profile(UserRole::Admin, None);
        let id = Uuid::new_v4();

        assert_eq!(resolve_scope(&admin, Some(&id.to_string())).unwrap().0, id);
        assert!(matches!(resolve_scope(&admin, None), Err(AppError::BadRequest(_))));
        assert!(matches!(resolve_scope(&admin, Some("abc")), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn employees_have_no_company_scope() {
        let user = profile(UserRole::User, Some(Uuid::new_v4()));
        assert!(matches!(resolve_scope(&user, None), Err(AppError::Forbidden(_))));
    }
}
