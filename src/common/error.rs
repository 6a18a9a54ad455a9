use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::work_order::WorkOrderStatus;

// Nosso tipo de erro da aplicação. Tudo que sai de repositórios e serviços é AppError.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo obrigatório ausente: {0}")]
    MissingField(&'static str),

    #[error("Token inválido")]
    InvalidToken,

    #[error("{entity} {id} não encontrado")]
    NotFound { entity: &'static str, id: i32 },

    #[error("OT {id} está em {status} e não aceita '{action}'")]
    InvalidState { id: i32, status: WorkOrderStatus, action: &'static str },

    #[error("Empregado {0} inexistente ou inativo")]
    InvalidOperator(i32),

    #[error("Ação não permitida: {0}")]
    Forbidden(String),

    #[error("OT {0} já foi tomada por um operário")]
    AlreadyClaimed(i32),

    #[error("O reclamo {0} já tem uma OT")]
    WorkOrderAlreadyExists(i32),

    #[error("Já existe uma cuadrilla chamada '{0}'")]
    CrewNameTaken(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        AppError::NotFound { entity, id }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InvalidState { .. }
            | AppError::AlreadyClaimed(_)
            | AppError::WorkOrderAlreadyExists(_)
            | AppError::CrewNameTaken(_) => StatusCode::CONFLICT,
            AppError::InvalidOperator(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Chave do catálogo de mensagens (e `code` da resposta).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::MissingField(_) => "MISSING_FIELD",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::InvalidState { .. } => "INVALID_STATE",
            AppError::InvalidOperator(_) => "INVALID_OPERATOR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::AlreadyClaimed(_) => "ALREADY_CLAIMED",
            AppError::WorkOrderAlreadyExists(_) => "WORK_ORDER_ALREADY_EXISTS",
            AppError::CrewNameTaken(_) => "CREW_NAME_TAKEN",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// Converte para a resposta HTTP traduzida para o idioma do pedido.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status_code();
        let code = self.code();
        let lang = locale.0.as_str();

        let (args, details): (Vec<(&str, String)>, Option<serde_json::Value>) = match &self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| i18n.translate(lang, m, &[("field", field.to_string())]))
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                (vec![], Some(serde_json::Value::Object(details)))
            }
            AppError::MissingField(field) => (vec![("field", field.to_string())], None),
            AppError::NotFound { entity, id } => {
                (vec![("entity", entity.to_string()), ("id", id.to_string())], None)
            }
            AppError::InvalidState { id, status, action } => (
                vec![("id", id.to_string()), ("status", status.to_string()), ("action", action.to_string())],
                None,
            ),
            AppError::InvalidOperator(id)
            | AppError::AlreadyClaimed(id)
            | AppError::WorkOrderAlreadyExists(id) => (vec![("id", id.to_string())], None),
            AppError::CrewNameTaken(name) => (vec![("name", name.clone())], None),
            AppError::Forbidden(reason) => {
                tracing::warn!("Ação negada: {}", reason);
                (vec![], None)
            }
            AppError::InvalidToken => (vec![], None),
            e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_)) => {
                // O `tracing` registra a mensagem detalhada; o cliente recebe a genérica.
                tracing::error!("Erro Interno do Servidor: {}", e);
                (vec![], None)
            }
        };

        ApiError {
            status,
            code,
            error: i18n.translate(lang, code, &args),
            details,
        }
    }
}

/// Erro já pronto para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "code": self.code,
            "error": self.error,
            "details": self.details,
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(err: AppError, lang: &str) -> ApiError {
        let store = I18nStore::load().unwrap();
        err.to_api_error(&Locale(lang.to_string()), &store)
    }

    #[test]
    fn state_conflicts_are_409_not_500() {
        let err = AppError::InvalidState { id: 42, status: WorkOrderStatus::Completed, action: "cancelar" };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyClaimed(42).status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn authorization_failures_are_403() {
        assert_eq!(AppError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn messages_are_localized_and_interpolated() {
        let es = api(AppError::AlreadyClaimed(42), "es");
        assert_eq!(es.status, StatusCode::CONFLICT);
        assert_eq!(es.code, "ALREADY_CLAIMED");
        assert!(es.error.contains("42"), "{}", es.error);

        let en = api(AppError::not_found("orden_trabajo", 7), "en");
        assert_eq!(en.status, StatusCode::NOT_FOUND);
        assert!(en.error.contains('7'));
        assert_ne!(en.error, api(AppError::not_found("orden_trabajo", 7), "es").error);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = api(AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2")), "es");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.error.contains("hunter2"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut e = validator::ValidationError::new("blank");
        e.message = Some("FIELD_REQUIRED".into());
        errors.add("motivo", e);

        let api = api(AppError::ValidationError(errors), "es");
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert!(details["motivo"][0].as_str().unwrap().contains("motivo"));
    }
}
