// src/handlers/crews.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::not_blank,
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        crew::{Crew, CrewMember},
        ApiResponse,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCrewPayload {
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "FIELD_REQUIRED"),
        length(max = 100, message = "VALIDATION_ERROR")
    )]
    #[schema(example = "Cuadrilla Norte")]
    pub nombre: String,

    #[schema(example = "Zona Rural Norte")]
    pub zona: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddMemberPayload {
    #[validate(required(message = "FIELD_REQUIRED"))]
    #[schema(example = 7)]
    pub empleado_id: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MembersQuery {
    /// Inclui associações encerradas.
    #[serde(default)]
    pub todos: bool,
}

// GET /api/cuadrillas
#[utoipa::path(
    get,
    path = "/api/cuadrillas",
    tag = "Crews",
    responses((status = 200, description = "Cuadrillas", body = ApiResponse<Vec<Crew>>)),
    security(("api_jwt" = []))
)]
pub async fn list_crews(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let crews = app_state
        .crew_service
        .list(&app_state.db_pool)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(crews)))
}

// POST /api/cuadrillas
#[utoipa::path(
    post,
    path = "/api/cuadrillas",
    tag = "Crews",
    request_body = CreateCrewPayload,
    responses(
        (status = 201, description = "Cuadrilla criada", body = ApiResponse<Crew>),
        (status = 409, description = "Nome já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_crew(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<CreateCrewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let crew = app_state
        .crew_service
        .create(&app_state.db_pool, &payload.nombre, payload.zona.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(crew))))
}

// GET /api/cuadrillas/{id}/miembros
#[utoipa::path(
    get,
    path = "/api/cuadrillas/{id}/miembros",
    tag = "Crews",
    params(("id" = i32, Path, description = "ID da cuadrilla"), MembersQuery),
    responses(
        (status = 200, description = "Membros", body = ApiResponse<Vec<CrewMember>>),
        (status = 404, description = "Cuadrilla inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(crew_id): Path<i32>,
    Query(query): Query<MembersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let members = app_state
        .crew_service
        .members(&app_state.db_pool, crew_id, !query.todos)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(members)))
}

// POST /api/cuadrillas/{id}/miembros
#[utoipa::path(
    post,
    path = "/api/cuadrillas/{id}/miembros",
    tag = "Crews",
    params(("id" = i32, Path, description = "ID da cuadrilla")),
    request_body = AddMemberPayload,
    responses(
        (status = 201, description = "Membro ativo; associação anterior encerrada", body = ApiResponse<CrewMember>),
        (status = 404, description = "Cuadrilla inexistente"),
        (status = 422, description = "Empregado inexistente ou inativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(crew_id): Path<i32>,
    Json(payload): Json<AddMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    let employee_id = payload
        .empleado_id
        .ok_or_else(|| AppError::MissingField("empleado_id").to_api_error(&locale, &app_state.i18n_store))?;

    let member = app_state
        .crew_service
        .add_member(&app_state.db_pool, crew_id, employee_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(member))))
}

// DELETE /api/cuadrillas/{id}/miembros/{empleado_id}
#[utoipa::path(
    delete,
    path = "/api/cuadrillas/{id}/miembros/{empleado_id}",
    tag = "Crews",
    params(
        ("id" = i32, Path, description = "ID da cuadrilla"),
        ("empleado_id" = i32, Path, description = "ID do empregado")
    ),
    responses(
        (status = 200, description = "Associação encerrada"),
        (status = 404, description = "Empregado não é membro ativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    State(app_state): State<AppState>,
    locale: Locale,
    Path((crew_id, employee_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crew_service
        .remove_member(&app_state.db_pool, crew_id, employee_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state
        .i18n_store
        .translate(&locale.0, "MEMBER_REMOVED", &[("id", employee_id.to_string())]);
    Ok(Json(ApiResponse::with_message(employee_id, message)))
}
