// src/models/crew.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Crew {
    #[schema(example = 3)]
    pub id: i32,
    #[sqlx(rename = "nombre")]
    #[schema(example = "Cuadrilla Norte")]
    pub name: String,
    #[sqlx(rename = "zona")]
    #[schema(example = "Zona Rural Norte")]
    pub zone: Option<String>,
    #[sqlx(rename = "activa")]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CrewMember {
    pub membership_id: i32,
    pub employee_id: i32,
    pub crew_id: i32,
    pub full_name: String,
    pub active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

/// Empregado (cadastro externo ao núcleo; só o necessário para OT e auth).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Employee {
    #[schema(example = 7)]
    pub id: i32,
    #[sqlx(rename = "nombre")]
    pub first_name: String,
    #[sqlx(rename = "apellido")]
    pub last_name: String,
    #[sqlx(rename = "activo")]
    pub active: bool,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
