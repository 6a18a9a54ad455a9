// src/models/complaint.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{work_order::WorkOrderAction, UnknownValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ComplaintStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "EN_PROCESO", alias = "EN PROCESO")]
    InProgress,
    #[serde(rename = "RESUELTO")]
    Resolved,
    #[serde(rename = "CERRADO")]
    Closed,
}

impl ComplaintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "PENDIENTE",
            ComplaintStatus::InProgress => "EN_PROCESO",
            ComplaintStatus::Resolved => "RESUELTO",
            ComplaintStatus::Closed => "CERRADO",
        }
    }

    /// Estado que o reclamo assume quando a OT dele sofre `action`.
    /// `None` = o reclamo não muda.
    pub fn follow(action: WorkOrderAction) -> Option<ComplaintStatus> {
        match action {
            WorkOrderAction::AssignDirect | WorkOrderAction::Claim => Some(ComplaintStatus::InProgress),
            WorkOrderAction::Complete => Some(ComplaintStatus::Resolved),
            WorkOrderAction::Cancel => Some(ComplaintStatus::Pending),
            WorkOrderAction::AssignToCrew
            | WorkOrderAction::Start
            | WorkOrderAction::PullFromPool
            | WorkOrderAction::Reopen => None,
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PENDIENTE" => Ok(ComplaintStatus::Pending),
            "EN_PROCESO" | "EN PROCESO" => Ok(ComplaintStatus::InProgress),
            "RESUELTO" => Ok(ComplaintStatus::Resolved),
            "CERRADO" => Ok(ComplaintStatus::Closed),
            other => Err(UnknownValue { column: "reclamo.estado", value: other.to_string() }),
        }
    }
}

text_column!(ComplaintStatus);

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Complaint {
    #[schema(example = 10)]
    pub id: i32,
    #[sqlx(rename = "cuenta_id")]
    pub account_id: i32,
    #[sqlx(rename = "tipo_id")]
    pub type_id: i32,
    #[sqlx(rename = "prioridad_id")]
    pub priority_id: Option<i32>,
    #[sqlx(rename = "descripcion")]
    #[schema(example = "Sin suministro eléctrico desde anoche")]
    pub description: String,
    #[sqlx(rename = "estado")]
    pub status: ComplaintStatus,
    #[sqlx(rename = "observaciones_cierre")]
    pub closing_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(rename = "fecha_cierre")]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Dados de entrada do registro de um reclamo (a OT nasce junto).
#[derive(Debug, Clone)]
pub struct NewComplaint {
    pub account_id: i32,
    pub type_id: i32,
    pub priority_id: Option<i32>,
    pub description: String,
    pub intervention_address: Option<String>,
    pub notes: Option<String>,
}
