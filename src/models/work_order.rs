// src/models/work_order.rs

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{complaint::Complaint, UnknownValue};

// =============================================================================
//  MÁQUINA DE ESTADOS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WorkOrderStatus {
    #[serde(rename = "PENDIENTE")]
    Pending,
    #[serde(rename = "ASIGNADA")]
    Assigned,
    #[serde(rename = "EN_CURSO", alias = "EN CURSO")]
    InProgress,
    #[serde(rename = "COMPLETADA")]
    Completed,
    #[serde(rename = "CANCELADA")]
    Cancelled,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pending => "PENDIENTE",
            WorkOrderStatus::Assigned => "ASIGNADA",
            WorkOrderStatus::InProgress => "EN_CURSO",
            WorkOrderStatus::Completed => "COMPLETADA",
            WorkOrderStatus::Cancelled => "CANCELADA",
        }
    }

    /// Estado resultante de aplicar `action`, ou `None` se a transição não existe.
    pub fn apply(self, action: WorkOrderAction) -> Option<WorkOrderStatus> {
        use WorkOrderAction as A;
        use WorkOrderStatus as S;

        match (self, action) {
            (S::Pending, A::AssignDirect) => Some(S::Assigned),
            (S::Pending, A::AssignToCrew) => Some(S::Assigned),
            (S::Pending | S::Assigned, A::Claim) => Some(S::Assigned),
            (S::Assigned, A::Start) => Some(S::InProgress),
            (S::InProgress, A::Complete) => Some(S::Completed),
            (S::Pending | S::Assigned, A::Cancel) => Some(S::Cancelled),
            (S::Pending | S::Assigned, A::PullFromPool) => Some(S::Pending),
            (S::Cancelled, A::Reopen) => Some(S::Pending),

            (S::Pending, A::Start | A::Complete | A::Reopen) => None,
            (S::Assigned, A::AssignDirect | A::AssignToCrew | A::Complete | A::Reopen) => None,
            (S::InProgress, _) => None,
            (S::Completed, _) => None,
            (S::Cancelled, _) => None,
        }
    }
}

impl FromStr for WorkOrderStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "PENDIENTE" => Ok(WorkOrderStatus::Pending),
            "ASIGNADA" => Ok(WorkOrderStatus::Assigned),
            // Legado: o valor antigo era gravado com espaço
            "EN_CURSO" | "EN CURSO" => Ok(WorkOrderStatus::InProgress),
            "COMPLETADA" => Ok(WorkOrderStatus::Completed),
            "CANCELADA" => Ok(WorkOrderStatus::Cancelled),
            other => Err(UnknownValue { column: "orden_trabajo.estado", value: other.to_string() }),
        }
    }
}

text_column!(WorkOrderStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOrderAction {
    AssignDirect,
    AssignToCrew,
    Claim,
    Start,
    Complete,
    Cancel,
    PullFromPool,
    Reopen,
}

impl WorkOrderAction {
    pub const ALL: [WorkOrderAction; 8] = [
        WorkOrderAction::AssignDirect,
        WorkOrderAction::AssignToCrew,
        WorkOrderAction::Claim,
        WorkOrderAction::Start,
        WorkOrderAction::Complete,
        WorkOrderAction::Cancel,
        WorkOrderAction::PullFromPool,
        WorkOrderAction::Reopen,
    ];

    /// Estados a partir dos quais a ação é válida. Vai direto para o
    /// `WHERE estado = ANY($n)` do UPDATE condicional.
    pub fn sources(self) -> &'static [WorkOrderStatus] {
        use WorkOrderStatus as S;

        match self {
            WorkOrderAction::AssignDirect | WorkOrderAction::AssignToCrew => &[S::Pending],
            WorkOrderAction::Claim => &[S::Pending, S::Assigned],
            WorkOrderAction::Start => &[S::Assigned],
            WorkOrderAction::Complete => &[S::InProgress],
            WorkOrderAction::Cancel => &[S::Pending, S::Assigned],
            WorkOrderAction::PullFromPool => &[S::Pending, S::Assigned],
            WorkOrderAction::Reopen => &[S::Cancelled],
        }
    }

    pub fn target(self) -> WorkOrderStatus {
        match self {
            WorkOrderAction::AssignDirect
            | WorkOrderAction::AssignToCrew
            | WorkOrderAction::Claim => WorkOrderStatus::Assigned,
            WorkOrderAction::Start => WorkOrderStatus::InProgress,
            WorkOrderAction::Complete => WorkOrderStatus::Completed,
            WorkOrderAction::Cancel => WorkOrderStatus::Cancelled,
            WorkOrderAction::PullFromPool | WorkOrderAction::Reopen => WorkOrderStatus::Pending,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WorkOrderAction::AssignDirect => "asignar",
            WorkOrderAction::AssignToCrew => "asignar_cuadrilla",
            WorkOrderAction::Claim => "tomar",
            WorkOrderAction::Start => "iniciar",
            WorkOrderAction::Complete => "completar",
            WorkOrderAction::Cancel => "cancelar",
            WorkOrderAction::PullFromPool => "retirar",
            WorkOrderAction::Reopen => "reabrir",
        }
    }
}

// =============================================================================
//  REGISTROS
// =============================================================================

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct WorkOrder {
    #[schema(example = 42)]
    pub id: i32,
    #[sqlx(rename = "reclamo_id")]
    #[schema(example = 10)]
    pub complaint_id: i32,
    #[sqlx(rename = "empleado_id")]
    pub assigned_operator_id: Option<i32>,
    #[sqlx(rename = "estado")]
    pub status: WorkOrderStatus,
    /// Data do itinerário, ou o instante em que a OT foi atribuída diretamente.
    #[sqlx(rename = "fecha_programada")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[sqlx(rename = "fecha_cierre")]
    pub closed_at: Option<DateTime<Utc>>,
    #[sqlx(rename = "direccion_intervencion")]
    #[schema(example = "Av. San Martín 1234")]
    pub intervention_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Linha da listagem com filtros (`GET /ot-tecnicas`).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct WorkOrderListItem {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub work_order: WorkOrder,
    pub complaint_description: String,
    pub complaint_status: super::complaint::ComplaintStatus,
    pub priority: Option<String>,
    pub assigned_operator_name: Option<String>,
    pub crew_id: Option<i32>,
    pub itinerary_date: Option<NaiveDate>,
    #[serde(skip)]
    pub total_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WorkOrderFilter {
    /// PENDIENTE, ASIGNADA, EN_CURSO, COMPLETADA, CANCELADA
    #[param(value_type = Option<String>)]
    pub estado: Option<WorkOrderStatus>,
    pub empleado_id: Option<i32>,
    pub cuadrilla_id: Option<i32>,
    pub limite: Option<i64>,
    pub offset: Option<i64>,
}

impl WorkOrderFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn limit(&self) -> i64 {
        self.limite.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Onde a OT está (ou esteve) no pool de uma cuadrilla.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ItineraryPlacement {
    pub itinerary_id: i32,
    pub entry_id: i32,
    pub crew_id: i32,
    pub crew_name: String,
    pub date: NaiveDate,
    pub order: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkOrderDetail {
    #[serde(flatten)]
    pub work_order: WorkOrder,
    pub assigned_operator_name: Option<String>,
    pub complaint: Complaint,
    pub itinerary: Option<ItineraryPlacement>,
    pub events: Vec<WorkOrderEvent>,
    /// Observações no formato legado (eventos concatenados).
    pub observaciones: String,
}

// =============================================================================
//  EVENTOS (log de auditoria)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum EventKind {
    #[serde(rename = "CREADA")]
    Created,
    #[serde(rename = "ASIGNADA")]
    Assigned,
    #[serde(rename = "EN_ITINERARIO")]
    Pooled,
    #[serde(rename = "TOMADA")]
    Claimed,
    #[serde(rename = "INICIADA")]
    Started,
    #[serde(rename = "COMPLETADA")]
    Completed,
    #[serde(rename = "CANCELADA")]
    Cancelled,
    #[serde(rename = "RETIRADA")]
    Pulled,
    #[serde(rename = "REABIERTA")]
    Reopened,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "CREADA",
            EventKind::Assigned => "ASIGNADA",
            EventKind::Pooled => "EN_ITINERARIO",
            EventKind::Claimed => "TOMADA",
            EventKind::Started => "INICIADA",
            EventKind::Completed => "COMPLETADA",
            EventKind::Cancelled => "CANCELADA",
            EventKind::Pulled => "RETIRADA",
            EventKind::Reopened => "REABIERTA",
        }
    }
}

impl FromStr for EventKind {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREADA" => Ok(EventKind::Created),
            "ASIGNADA" => Ok(EventKind::Assigned),
            "EN_ITINERARIO" => Ok(EventKind::Pooled),
            "TOMADA" => Ok(EventKind::Claimed),
            "INICIADA" => Ok(EventKind::Started),
            "COMPLETADA" => Ok(EventKind::Completed),
            "CANCELADA" => Ok(EventKind::Cancelled),
            "RETIRADA" => Ok(EventKind::Pulled),
            "REABIERTA" => Ok(EventKind::Reopened),
            other => Err(UnknownValue { column: "ot_evento.accion", value: other.to_string() }),
        }
    }
}

text_column!(EventKind);

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct WorkOrderEvent {
    pub id: i64,
    #[sqlx(rename = "ot_id")]
    pub work_order_id: i32,
    pub actor_id: Option<i32>,
    pub actor_name: Option<String>,
    #[sqlx(rename = "accion")]
    pub kind: EventKind,
    #[sqlx(rename = "texto")]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Evento ainda não gravado.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub actor_id: Option<i32>,
    pub kind: EventKind,
    pub text: String,
}

impl NewEvent {
    pub fn new(actor_id: Option<i32>, kind: EventKind, text: impl Into<String>) -> Self {
        Self { actor_id, kind, text: text.into() }
    }
}

pub const STAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

pub fn stamp(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

pub fn claim_note(operator_name: &str, at: DateTime<Utc>) -> String {
    format!("Tomada por: {} - {}", operator_name, stamp(at))
}

pub fn cancel_note(reason: &str) -> String {
    format!("CANCELADA: {}", reason.trim())
}

/// Anotação de fechamento. Quando quem fecha não é quem tomou a OT, as duas
/// pessoas aparecem.
pub fn closing_note(
    notes: &str,
    assigned_name: Option<&str>,
    closer_name: &str,
    at: DateTime<Utc>,
) -> String {
    let annotation = match assigned_name {
        Some(assigned) if assigned != closer_name => {
            format!("Tomada por: {} / Cerrada por: {} - {}", assigned, closer_name, stamp(at))
        }
        _ => format!("Cerrada por: {} - {}", closer_name, stamp(at)),
    };
    format!("{}\n{}", notes.trim(), annotation)
}

/// Concatenação legada das observações, só para apresentação.
pub fn render_notes(events: &[WorkOrderEvent]) -> String {
    events
        .iter()
        .map(|e| e.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
//  AUTORIZAÇÃO DE FECHAMENTO
// =============================================================================

/// Dados necessários para decidir quem pode fechar uma OT.
#[derive(Debug, Clone, FromRow)]
pub struct CompletionContext {
    #[sqlx(rename = "estado")]
    pub status: WorkOrderStatus,
    #[sqlx(rename = "empleado_id")]
    pub assigned_operator_id: Option<i32>,
    pub assigned_operator_name: Option<String>,
    pub is_itinerary: bool,
    pub itinerary_crew_id: Option<i32>,
    pub assigned_crew_id: Option<i32>,
    pub closer_crew_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDenied {
    /// OT de itinerário: quem fecha não está na cuadrilla de quem tomou.
    NotSameCrew,
    /// OT atribuída diretamente: só quem recebeu pode fechar.
    NotAssignee,
}

impl CompletionContext {
    pub fn authorize(&self, closer_id: i32) -> Result<(), CompletionDenied> {
        if self.is_itinerary {
            match (self.assigned_crew_id, self.closer_crew_id) {
                (Some(assigned), Some(closer)) if assigned == closer => Ok(()),
                _ => Err(CompletionDenied::NotSameCrew),
            }
        } else if self.assigned_operator_id == Some(closer_id) {
            Ok(())
        } else {
            Err(CompletionDenied::NotAssignee)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx(is_itinerary: bool, assigned: Option<i32>, assigned_crew: Option<i32>, closer_crew: Option<i32>) -> CompletionContext {
        CompletionContext {
            status: WorkOrderStatus::InProgress,
            assigned_operator_id: assigned,
            assigned_operator_name: Some("Ana Gómez".into()),
            is_itinerary,
            itinerary_crew_id: if is_itinerary { assigned_crew } else { None },
            assigned_crew_id: assigned_crew,
            closer_crew_id: closer_crew,
        }
    }

    #[test]
    fn direct_path_runs_once() {
        let mut status = WorkOrderStatus::Pending;
        for action in [WorkOrderAction::AssignDirect, WorkOrderAction::Start, WorkOrderAction::Complete] {
            status = status.apply(action).expect("transição válida");
            // Repetir o mesmo passo depois do sucesso precisa falhar
            assert_eq!(status.apply(action), None, "{:?} repetida a partir de {:?}", action, status);
        }
        assert_eq!(status, WorkOrderStatus::Completed);
    }

    #[test]
    fn cancel_only_from_open_states() {
        assert_eq!(WorkOrderStatus::Pending.apply(WorkOrderAction::Cancel), Some(WorkOrderStatus::Cancelled));
        assert_eq!(WorkOrderStatus::Assigned.apply(WorkOrderAction::Cancel), Some(WorkOrderStatus::Cancelled));
        assert_eq!(WorkOrderStatus::InProgress.apply(WorkOrderAction::Cancel), None);
        assert_eq!(WorkOrderStatus::Completed.apply(WorkOrderAction::Cancel), None);
        assert_eq!(WorkOrderStatus::Cancelled.apply(WorkOrderAction::Reopen), Some(WorkOrderStatus::Pending));
    }

    #[test]
    fn terminal_states_accept_nothing_but_reopen() {
        for action in WorkOrderAction::ALL {
            assert_eq!(WorkOrderStatus::Completed.apply(action), None);
            if action != WorkOrderAction::Reopen {
                assert_eq!(WorkOrderStatus::Cancelled.apply(action), None);
            }
        }
    }

    #[test]
    fn sources_and_target_agree_with_apply() {
        let all = [
            WorkOrderStatus::Pending,
            WorkOrderStatus::Assigned,
            WorkOrderStatus::InProgress,
            WorkOrderStatus::Completed,
            WorkOrderStatus::Cancelled,
        ];
        for action in WorkOrderAction::ALL {
            for status in all {
                let expected = action.sources().contains(&status).then(|| action.target());
                assert_eq!(status.apply(action), expected, "{:?} em {:?}", action, status);
            }
        }
    }

    #[test]
    fn status_parses_legacy_spelling() {
        assert_eq!("EN CURSO".parse::<WorkOrderStatus>().unwrap(), WorkOrderStatus::InProgress);
        assert_eq!("EN_CURSO".parse::<WorkOrderStatus>().unwrap(), WorkOrderStatus::InProgress);
        assert!("ABIERTA".parse::<WorkOrderStatus>().is_err());
        let json: WorkOrderStatus = serde_json::from_str("\"EN CURSO\"").unwrap();
        assert_eq!(json, WorkOrderStatus::InProgress);
        assert_eq!(serde_json::to_string(&WorkOrderStatus::Assigned).unwrap(), "\"ASIGNADA\"");
    }

    #[test]
    fn pooled_order_closable_by_any_member_of_the_claimer_crew() {
        assert_eq!(ctx(true, Some(7), Some(3), Some(3)).authorize(8), Ok(()));
        assert_eq!(ctx(true, Some(7), Some(3), Some(5)).authorize(9), Err(CompletionDenied::NotSameCrew));
        assert_eq!(ctx(true, Some(7), None, Some(3)).authorize(8), Err(CompletionDenied::NotSameCrew));
        assert_eq!(ctx(true, Some(7), Some(3), None).authorize(8), Err(CompletionDenied::NotSameCrew));
    }

    #[test]
    fn direct_order_closable_only_by_assignee() {
        assert_eq!(ctx(false, Some(7), Some(3), Some(3)).authorize(7), Ok(()));
        // Mesma cuadrilla não basta fora do itinerário
        assert_eq!(ctx(false, Some(7), Some(3), Some(3)).authorize(8), Err(CompletionDenied::NotAssignee));
        assert_eq!(ctx(false, None, None, None).authorize(8), Err(CompletionDenied::NotAssignee));
    }

    #[test]
    fn closing_note_names_both_people_when_they_differ() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap();
        assert_eq!(
            closing_note(" Se cambió el medidor ", Some("Ana Gómez"), "Luis Paz", at),
            "Se cambió el medidor\nTomada por: Ana Gómez / Cerrada por: Luis Paz - 01/06/2025 14:30"
        );
        assert_eq!(
            closing_note("Listo", Some("Luis Paz"), "Luis Paz", at),
            "Listo\nCerrada por: Luis Paz - 01/06/2025 14:30"
        );
    }

    #[test]
    fn render_notes_skips_blank_events() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let event = |id, kind, text: &str| WorkOrderEvent {
            id,
            work_order_id: 42,
            actor_id: Some(7),
            actor_name: None,
            kind,
            text: text.to_string(),
            created_at: at,
        };
        let events = vec![
            event(1, EventKind::Created, ""),
            event(2, EventKind::Claimed, &claim_note("Ana Gómez", at)),
            event(3, EventKind::Cancelled, &cancel_note("  sin acceso ")),
        ];
        assert_eq!(render_notes(&events), "Tomada por: Ana Gómez - 01/06/2025 09:00\nCANCELADA: sin acceso");
    }
}
