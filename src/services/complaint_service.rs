// src/services/complaint_service.rs

use serde::Serialize;
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    db::ComplaintRepository,
    models::{
        complaint::{Complaint, NewComplaint},
        work_order::WorkOrder,
    },
    services::work_order_service::WorkOrderService,
};

/// Reclamo recém-registrado junto com a OT que nasceu com ele.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredComplaint {
    pub complaint: Complaint,
    pub work_order: WorkOrder,
}

#[derive(Clone)]
pub struct ComplaintService {
    repo: ComplaintRepository,
    work_orders: WorkOrderService,
}

impl ComplaintService {
    pub fn new(repo: ComplaintRepository, work_orders: WorkOrderService) -> Self {
        Self { repo, work_orders }
    }

    /// Entrada do reclamo: grava o reclamo (PENDIENTE) e a sua OT (PENDIENTE)
    /// na mesma transação.
    pub async fn register<'e, E>(
        &self,
        executor: E,
        new: &NewComplaint,
        actor_id: i32,
    ) -> Result<RegisteredComplaint, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let complaint = self.repo.insert(&mut *tx, new).await?;
        let work_order = self
            .work_orders
            .create_in(
                &mut *tx,
                complaint.id,
                new.intervention_address.as_deref(),
                new.notes.as_deref(),
                Some(actor_id),
            )
            .await?;

        tx.commit().await?;
        tracing::info!(reclamo_id = complaint.id, ot_id = work_order.id, actor_id, "Reclamo registrado");
        Ok(RegisteredComplaint { complaint, work_order })
    }
}
