// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::ProfileRepository,
    models::auth::{AuthResponse, Claims, Profile},
};

#[derive(Clone)]
pub struct AuthService {
    profile_repo: ProfileRepository,
    jwt_secret: String,
    jwt_expiration_days: i64,
}

impl AuthService {
    pub fn new(profile_repo: ProfileRepository, jwt_secret: String, jwt_expiration_days: i64) -> Self {
        Self { profile_repo, jwt_secret, jwt_expiration_days }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let profile = self
            .profile_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &profile.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        // A senha certa numa conta desativada não dá acesso
        if !profile.is_active {
            return Err(AppError::InactiveAccount);
        }

        let token = self.create_token(&profile)?;
        tracing::info!(user_id = %profile.id, role = profile.role.as_str(), "Login efetuado");

        Ok(AuthResponse { token, profile })
    }

    /// Token -> perfil ativo.
    pub async fn validate_token(&self, token: &str) -> Result<Profile, AppError> {
        let claims = decode_claims(&self.jwt_secret, token)?;

        let profile = self
            .profile_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !profile.is_active {
            return Err(AppError::InactiveAccount);
        }
        Ok(profile)
    }

    pub fn create_token(&self, profile: &Profile) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(self.jwt_expiration_days);

        let claims = Claims {
            sub: profile.id,
            role: profile.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

fn decode_claims(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

// Hashing fora do runtime async
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserRole;
    use uuid::Uuid;

    fn token_for(secret: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: UserRole::Hr,
            exp: (now + exp_offset_secs) as usize,
            iat: now as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    #[test]
    fn token_carries_role() {
        let token = token_for("segredo", 3600);
        let claims = decode_claims("segredo", &token).unwrap();
        assert_eq!(claims.role, UserRole::Hr);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = token_for("outro", 3600);
        assert!(matches!(decode_claims("segredo", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = token_for("segredo", -3600);
        assert!(matches!(decode_claims("segredo", &token), Err(AppError::InvalidToken)));
    }

    #[tokio::test]
    async fn password_hash_verifies() {
        let hashed = hash_password("senha-forte").await.unwrap();
        assert!(verify_password("senha-forte", &hashed).await.unwrap());
        assert!(!verify_password("errada", &hashed).await.unwrap());
    }
}
