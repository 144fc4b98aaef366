// src/middleware/roles.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::auth::AuthenticatedUser,
    models::auth::UserRole,
};

/// Conjunto de papéis que podem usar uma rota.
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [UserRole];
}

/// Guardião por papel. Vai junto com `AuthenticatedUser` na assinatura do handler.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        check_role(user.0.role, T::allowed())?;
        Ok(RequireRole(PhantomData))
    }
}

fn check_role(role: UserRole, allowed: &[UserRole]) -> Result<(), AppError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "O perfil '{}' não tem acesso a este recurso.",
            role.as_str()
        )))
    }
}

// ---
// PAPÉIS
// ---

pub struct AdminOnly;
impl RoleDef for AdminOnly {
    fn allowed() -> &'static [UserRole] { &[UserRole::Admin] }
}

pub struct HrOrAdmin;
impl RoleDef for HrOrAdmin {
    fn allowed() -> &'static [UserRole] { &[UserRole::Hr, UserRole::Admin] }
}

pub struct PrestadorOnly;
impl RoleDef for PrestadorOnly {
    fn allowed() -> &'static [UserRole] { &[UserRole::Prestador] }
}

pub struct PrestadorOrAdmin;
impl RoleDef for PrestadorOrAdmin {
    fn allowed() -> &'static [UserRole] { &[UserRole::Prestador, UserRole::Admin] }
}

pub struct UserOnly;
impl RoleDef for UserOnly {
    fn allowed() -> &'static [UserRole] { &[UserRole::User] }
}

// Quem pode mudar o estado de uma marcação (o serviço filtra o resto)
pub struct BookingActor;
impl RoleDef for BookingActor {
    fn allowed() -> &'static [UserRole] { &[UserRole::User, UserRole::Prestador, UserRole::Admin] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn roles_outside_the_list_are_forbidden() {
        assert!(check_role(UserRole::Admin, AdminOnly::allowed()).is_ok());
        assert!(check_role(UserRole::Hr, HrOrAdmin::allowed()).is_ok());
        assert!(matches!(
            check_role(UserRole::User, HrOrAdmin::allowed()),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_role(UserRole::Prestador, UserOnly::allowed()).is_err());
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let (mut parts, _) = Request::new(()).into_parts();
        let err = RequireRole::<AdminOnly>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }
}
