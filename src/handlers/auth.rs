// src/handlers/auth.rs

use axum::Json;

use crate::{
    middleware::auth::AuthenticatedUser,
    models::{crew::Employee, ApiResponse},
};

// GET /api/me
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Empregado dono do token", body = ApiResponse<Employee>),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(employee): AuthenticatedUser) -> Json<ApiResponse<Employee>> {
    Json(ApiResponse::ok(employee))
}
