// src/services/complaint_sync.rs

use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::{
    common::error::AppError,
    db::ComplaintRepository,
    models::{
        complaint::{Complaint, ComplaintStatus},
        work_order::{WorkOrder, WorkOrderAction},
    },
};

/// Propaga as transições da OT para o reclamo, sempre dentro da transação de quem chamou.
#[derive(Clone, Default)]
pub struct ComplaintSync {
    complaint_repo: ComplaintRepository,
}

impl ComplaintSync {
    pub fn new(complaint_repo: ComplaintRepository) -> Self {
        Self { complaint_repo }
    }

    /// Aplica no reclamo o efeito de `action`. Devolve o reclamo atualizado,
    /// ou `None` quando a ação não mexe no reclamo.
    pub async fn follow(
        &self,
        conn: &mut PgConnection,
        work_order: &WorkOrder,
        action: WorkOrderAction,
        closing_notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Option<Complaint>, AppError> {
        let Some(status) = ComplaintStatus::follow(action) else {
            return Ok(None);
        };

        let complaint = self
            .complaint_repo
            .set_status(&mut *conn, work_order.complaint_id, status, closing_notes, at)
            .await?;

        tracing::debug!(
            reclamo_id = complaint.id,
            ot_id = work_order.id,
            estado = %complaint.status,
            "Reclamo sincronizado com a OT"
        );

        Ok(Some(complaint))
    }
}
