// src/handlers/itineraries.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{
        itinerary::{PoolDay, PoolEntry},
        work_order::WorkOrder,
        ApiResponse,
    },
};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PoolQuery {
    /// Dia do itinerário. Sem ele: de hoje em diante.
    pub fecha: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PoolDatesQuery {
    /// Operário para contar quantas OTs ele já tomou em cada dia.
    pub empleado_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ClaimPayload {
    /// Cuadrilla do pool. Sem ela, vale a cuadrilla ativa de quem toma.
    #[schema(example = 3)]
    pub cuadrilla_id: Option<i32>,
}

impl ClaimPayload {
    /// O corpo é opcional: sem `Content-Type` JSON vale o payload vazio.
    fn from_body(body: Option<Json<Self>>) -> Self {
        body.map(|Json(payload)| payload).unwrap_or_default()
    }
}

// =============================================================================
//  POOL DA CUADRILLA
// =============================================================================

// GET /api/itinerarios/cuadrilla/{id}
#[utoipa::path(
    get,
    path = "/api/itinerarios/cuadrilla/{id}",
    tag = "Itineraries",
    params(("id" = i32, Path, description = "ID da cuadrilla"), PoolQuery),
    responses(
        (status = 200, description = "Pool ordenado", body = ApiResponse<Vec<PoolEntry>>),
        (status = 404, description = "Cuadrilla inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_crew_pool(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(crew_id): Path<i32>,
    Query(query): Query<PoolQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .itinerary_service
        .list_pool(&app_state.db_pool, crew_id, query.fecha)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let total = entries.len() as i64;
    Ok(Json(ApiResponse::with_total(entries, total)))
}

// GET /api/itinerarios/cuadrilla/{id}/fechas
#[utoipa::path(
    get,
    path = "/api/itinerarios/cuadrilla/{id}/fechas",
    tag = "Itineraries",
    params(("id" = i32, Path, description = "ID da cuadrilla"), PoolDatesQuery),
    responses(
        (status = 200, description = "Dias com trabalho no pool", body = ApiResponse<Vec<PoolDay>>),
        (status = 404, description = "Cuadrilla inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_crew_pool_dates(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(crew_id): Path<i32>,
    Query(query): Query<PoolDatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = app_state
        .itinerary_service
        .dates_with_pool(&app_state.db_pool, crew_id, query.empleado_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(days)))
}

// GET /api/itinerarios/mi-cuadrilla
#[utoipa::path(
    get,
    path = "/api/itinerarios/mi-cuadrilla",
    tag = "Itineraries",
    params(PoolQuery),
    responses(
        (status = 200, description = "Pool da cuadrilla de quem pede", body = ApiResponse<Vec<PoolEntry>>),
        (status = 404, description = "Operário sem cuadrilla ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_pool(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(query): Query<PoolQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = &app_state.itinerary_service;

    let crew_id = service
        .operator_crew(&app_state.db_pool, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let entries = service
        .list_pool(&app_state.db_pool, crew_id, query.fecha)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let total = entries.len() as i64;
    Ok(Json(ApiResponse::with_total(entries, total)))
}

// GET /api/itinerarios/mi-cuadrilla/fechas
#[utoipa::path(
    get,
    path = "/api/itinerarios/mi-cuadrilla/fechas",
    tag = "Itineraries",
    responses(
        (status = 200, description = "Dias com trabalho, com as OTs já tomadas por quem pede", body = ApiResponse<Vec<PoolDay>>),
        (status = 404, description = "Operário sem cuadrilla ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_pool_dates(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let service = &app_state.itinerary_service;

    let crew_id = service
        .operator_crew(&app_state.db_pool, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let days = service
        .dates_with_pool(&app_state.db_pool, crew_id, Some(user.id()))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(days)))
}

// =============================================================================
//  TOMADA E RETIRADA
// =============================================================================

// PUT /api/itinerarios/ot/{id}/tomar
#[utoipa::path(
    put,
    path = "/api/itinerarios/ot/{id}/tomar",
    tag = "Itineraries",
    params(("id" = i32, Path, description = "ID da OT")),
    request_body(content = Option<ClaimPayload>, description = "Opcional; sem corpo vale a cuadrilla ativa de quem toma"),
    responses(
        (status = 200, description = "OT tomada por quem pede", body = ApiResponse<WorkOrder>),
        (status = 403, description = "Quem pede não é membro ativo da cuadrilla"),
        (status = 404, description = "OT fora do pool da cuadrilla"),
        (status = 409, description = "Outro operário tomou primeiro")
    ),
    security(("api_jwt" = []))
)]
pub async fn claim_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
    body: Option<Json<ClaimPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = ClaimPayload::from_body(body);

    let work_order = app_state
        .itinerary_service
        .claim(&app_state.db_pool, id, user.id(), payload.cuadrilla_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ApiResponse::ok(work_order)))
}

// DELETE /api/itinerarios/ot/{id}
#[utoipa::path(
    delete,
    path = "/api/itinerarios/ot/{id}",
    tag = "Itineraries",
    params(("id" = i32, Path, description = "ID da OT")),
    responses(
        (status = 200, description = "OT fora do pool, de volta a PENDIENTE", body = ApiResponse<WorkOrder>),
        (status = 404, description = "OT não está em nenhum itinerário"),
        (status = 409, description = "OT já foi tomada")
    ),
    security(("api_jwt" = []))
)]
pub async fn pull_work_order(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    let work_order = app_state
        .itinerary_service
        .pull_from_pool(&app_state.db_pool, id, user.id())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let message = app_state
        .i18n_store
        .translate(&locale.0, "WORK_ORDER_PULLED", &[("id", id.to_string())]);
    Ok(Json(ApiResponse::with_message(work_order, message)))
}
