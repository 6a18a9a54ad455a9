// src/handlers/work_orders.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
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
    models::{
        work_order::{WorkOrder, WorkOrderDetail, WorkOrderFilter, WorkOrderListItem},
        ApiResponse,
    },
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateWorkOrderPayload {
    #[schema(example = 10)]
    pub reclamo_id: i32,

    /// Se informado, a OT já nasce atribuída a este empregado.
    #[schema(example = 7)]
    pub empleado_id: Option<i32>,

    #[schema(example = "Av. San Martín 1234")]
    pub direccion_intervencion: Option<String>,

    pub observaciones: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignPayload {
    #[validate(required(message = "FIELD_REQUIRED"))]
    #[schema(example = 7)]
    pub empleado_id: Option<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignCrewPayload {
    #[validate(required(message = "FIELD_REQUIRED"))]
    #[schema(example = 3)]
    pub cuadrilla_id: Option<i32>,

    #[validate(required(message = "FIELD_REQUIRED"))]
    #[schema(example = "2025-06-01")]
    pub fecha: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CompletePayload {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "FIELD_REQUIRED"))]
    #[schema(example = "Se reemplazó el fusible del transformador")]
    pub observaciones: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelPayload {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "FIELD_REQUIRED"))]
    #[schema(example = "Cliente ausente")]
    pub motivo: String,
}

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/ot-tecnicas
#[utoipa::path(
    get,
    path = "/api/ot-tecnicas",
    tag = "Work Orders",
    params(WorkOrderFilter),
    responses(
        (status = 200, description = "OTs filtradas, com o total sem paginação", body = ApiResponse<Vec<WorkOrderListItem>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_work_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(filter): Query<WorkOrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let (items, total) = app_state
        .work_order_service
        .list(&app_state.db_pool, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::with_total(items, total)))
}

// GET /api/ot-tecnicas/mis-ots
#[utoipa::path(
    get,
    path = "/api/ot-tecnicas/mis-ots",
    tag = "Work Orders",
    params(WorkOrderFilter),
    responses(
        (status = 200, description = "OTs do operário autenticado", body = ApiResponse<Vec<WorkOrderListItem>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_work_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(filter): Query<WorkOrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    list_for_operator(&app_state, &locale, user.id(), filter).await
}

// GET /api/ot-tecnicas/operario/{id}
#[utoipa::path(
    get,
    path = "/api/ot-tecnicas/operario/{id}",
    tag = "Work Orders",
    params(
        ("id" = i32, Path, description = "ID do empregado"),
        WorkOrderFilter
    ),
    responses(
        (status = 200, description = "OTs do operário", body = ApiResponse<Vec<WorkOrderListItem>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_operator_work_orders(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(operator_id): Path<i32>,
    Query(filter): Query<WorkOrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    list_for_operator(&app_state, &locale, operator_id, filter).await
}

async fn list_for_operator(
    app_state: &AppState,
    locale: &Locale,
    operator_id: i32,
    filter: WorkOrderFilter,
) -> Result<Json<ApiResponse<Vec<WorkOrderListItem>>>, ApiError> {
    let filter = WorkOrderFilter { empleado_id: Some(operator_id), ..filter };

    let (items, total) = app_state
        .work_order_service
        .list(&app_state.db_pool, &filter)
        .await
        .map_err(|e| e.to_api_error(locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::with_total(items, total)))
}

// GET /api/ot-tecnicas/{id}
#[utoipa::path(
    get,
    path = "/api/ot-tecnicas/{id}",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    responses(
        (status = 200, description = "OT com reclamo, itinerário, eventos e observações", body = ApiResponse<WorkOrderDetail>),
        (status = 404, description = "OT inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .work_order_service
        .get_detail(&app_state.db_pool, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(detail)))
}

// =============================================================================
//  CRIAÇÃO E TRANSIÇÕES
// =============================================================================

// POST /api/ot-tecnicas
#[utoipa::path(
    post,
    path = "/api/ot-tecnicas",
    tag = "Work Orders",
    request_body = CreateWorkOrderPayload,
    responses(
        (status = 201, description = "OT criada", body = ApiResponse<WorkOrder>),
        (status = 404, description = "Reclamo inexistente"),
        (status = 409, description = "O reclamo já tem OT"),
        (status = 422, description = "Empregado inexistente ou inativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateWorkOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let work_order = app_state
        .work_order_service
        .create(
            &app_state.db_pool,
            payload.reclamo_id,
            payload.empleado_id,
            payload.direccion_intervencion.as_deref(),
            payload.observaciones.as_deref(),
            user.id(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(work_order))))
}

// PUT /api/ot-tecnicas/{id}/asignar
#[utoipa::path(
    put,
    path = "/api/ot-tecnicas/{id}/asignar",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    request_body = AssignPayload,
    responses(
        (status = 200, description = "OT atribuída; reclamo EN_PROCESO", body = ApiResponse<WorkOrder>),
        (status = 400, description = "empleado_id ausente"),
        (status = 409, description = "OT não está PENDIENTE"),
        (status = 422, description = "Empregado inexistente ou inativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    let operator_id = payload
        .empleado_id
        .ok_or_else(|| AppError::MissingField("empleado_id").to_api_error(&locale, &app_state.i18n_store))?;

    let work_order = app_state
        .work_order_service
        .assign_direct(&app_state.db_pool, id, operator_id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(work_order)))
}

// PUT /api/ot-tecnicas/{id}/asignar-cuadrilla
#[utoipa::path(
    put,
    path = "/api/ot-tecnicas/{id}/asignar-cuadrilla",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    request_body = AssignCrewPayload,
    responses(
        (status = 200, description = "OT no pool da cuadrilla para a data", body = ApiResponse<WorkOrder>),
        (status = 404, description = "OT ou cuadrilla inexistente"),
        (status = 409, description = "OT não está PENDIENTE")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_work_order_to_crew(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<AssignCrewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;
    let (Some(crew_id), Some(date)) = (payload.cuadrilla_id, payload.fecha) else {
        return Err(AppError::MissingField("cuadrilla_id").to_api_error(&locale, &app_state.i18n_store));
    };

    let work_order = app_state
        .itinerary_service
        .assign_to_crew(&app_state.db_pool, id, crew_id, date, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(work_order)))
}

// PUT /api/ot-tecnicas/{id}/iniciar
#[utoipa::path(
    put,
    path = "/api/ot-tecnicas/{id}/iniciar",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    responses(
        (status = 200, description = "OT EN_CURSO", body = ApiResponse<WorkOrder>),
        (status = 401, description = "Sem autenticação"),
        (status = 403, description = "OT atribuída a outro operário"),
        (status = 409, description = "OT não está ASIGNADA")
    ),
    security(("api_jwt" = []))
)]
pub async fn start_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let work_order = app_state
        .work_order_service
        .start(&app_state.db_pool, id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(work_order)))
}

// PUT /api/ot-tecnicas/{id}/completar
#[utoipa::path(
    put,
    path = "/api/ot-tecnicas/{id}/completar",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    request_body = CompletePayload,
    responses(
        (status = 200, description = "OT COMPLETADA; reclamo RESUELTO", body = ApiResponse<WorkOrder>),
        (status = 400, description = "Observações vazias"),
        (status = 403, description = "Quem fecha não pode fechar esta OT"),
        (status = 409, description = "OT não está EN_CURSO")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<CompletePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let work_order = app_state
        .work_order_service
        .complete(&app_state.db_pool, id, user.id(), &payload.observaciones)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(work_order)))
}

// PUT /api/ot-tecnicas/{id}/cancelar
#[utoipa::path(
    put,
    path = "/api/ot-tecnicas/{id}/cancelar",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    request_body = CancelPayload,
    responses(
        (status = 200, description = "OT CANCELADA; reclamo volta a PENDIENTE", body = ApiResponse<WorkOrder>),
        (status = 400, description = "Motivo vazio"),
        (status = 409, description = "OT já em curso ou encerrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    Json(payload): Json<CancelPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let work_order = app_state
        .work_order_service
        .cancel(&app_state.db_pool, id, &payload.motivo, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state
        .i18n_store
        .translate(&locale.0, "WORK_ORDER_CANCELLED", &[("id", id.to_string())]);
    Ok(Json(ApiResponse::with_message(work_order, message)))
}

// PUT /api/ot-tecnicas/{id}/reabrir
#[utoipa::path(
    put,
    path = "/api/ot-tecnicas/{id}/reabrir",
    tag = "Work Orders",
    params(("id" = i32, Path, description = "ID da OT")),
    responses(
        (status = 200, description = "OT de volta a PENDIENTE", body = ApiResponse<WorkOrder>),
        (status = 409, description = "OT não está CANCELADA")
    ),
    security(("api_jwt" = []))
)]
pub async fn reopen_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let work_order = app_state
        .work_order_service
        .reopen(&app_state.db_pool, id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(work_order)))
}
