// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::EmployeeRepository,
    models::{auth::Claims, crew::Employee},
};

/// Validade dos tokens emitidos por `issue_token`.
const TOKEN_TTL_HOURS: i64 = 12;

#[derive(Clone)]
pub struct AuthService {
    employee_repo: EmployeeRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(employee_repo: EmployeeRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self { employee_repo, jwt_secret, pool }
    }

    /// Decodifica o token e carrega o empregado. Empregado inativo conta como token inválido.
    pub async fn validate_token(&self, token: &str) -> Result<Employee, AppError> {
        let employee_id = self.decode_subject(token)?;

        self.employee_repo
            .find_active(&self.pool, employee_id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn decode_subject(&self, token: &str) -> Result<i32, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims.sub)
    }

    /// A emissão de tokens é externa ao serviço; isto existe para ferramentas e testes.
    pub fn issue_token(&self, employee_id: i32) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = Claims {
            sub: employee_id,
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        // Pool preguiçoso: nenhum teste aqui chega a abrir conexão
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/ot_backend_unit")
            .unwrap();
        AuthService::new(EmployeeRepository::new(), secret.to_string(), pool)
    }

    #[tokio::test]
    async fn issued_token_decodes_to_the_employee() {
        let auth = service("segredo");
        let token = auth.issue_token(7).unwrap();
        assert_eq!(auth.decode_subject(&token).unwrap(), 7);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let token = service("outro").issue_token(7).unwrap();
        assert!(matches!(service("segredo").decode_subject(&token), Err(AppError::InvalidToken)));
        assert!(matches!(service("segredo").decode_subject("lixo"), Err(AppError::InvalidToken)));
    }
}
