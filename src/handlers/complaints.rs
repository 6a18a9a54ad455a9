// src/handlers/complaints.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::not_blank,
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{complaint::NewComplaint, ApiResponse},
    services::complaint_service::RegisteredComplaint,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterComplaintPayload {
    #[schema(example = 1)]
    pub cuenta_id: i32,

    #[schema(example = 2)]
    pub tipo_id: i32,

    #[schema(example = 1)]
    pub prioridad_id: Option<i32>,

    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "FIELD_REQUIRED"))]
    #[schema(example = "Sin suministro eléctrico desde anoche")]
    pub descripcion: String,

    #[schema(example = "Av. San Martín 1234")]
    pub direccion_intervencion: Option<String>,

    pub observaciones: Option<String>,
}

impl From<RegisterComplaintPayload> for NewComplaint {
    fn from(p: RegisterComplaintPayload) -> Self {
        NewComplaint {
            account_id: p.cuenta_id,
            type_id: p.tipo_id,
            priority_id: p.prioridad_id,
            description: p.descripcion,
            intervention_address: p.direccion_intervencion,
            notes: p.observaciones,
        }
    }
}

// POST /api/reclamos
#[utoipa::path(
    post,
    path = "/api/reclamos",
    tag = "Complaints",
    request_body = RegisterComplaintPayload,
    responses(
        (status = 201, description = "Reclamo e OT criados em PENDIENTE", body = ApiResponse<RegisteredComplaint>),
        (status = 400, description = "Descrição vazia"),
        (status = 404, description = "Conta, tipo ou prioridade inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_complaint(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<RegisterComplaintPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let registered = app_state
        .complaint_service
        .register(&app_state.db_pool, &payload.into(), user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(registered))))
}
