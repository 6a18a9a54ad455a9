// src/services/work_order_service.rs

use chrono::Utc;
use sqlx::{Acquire, Executor, PgConnection, Postgres};

use crate::{
    common::error::AppError,
    db::{ComplaintRepository, EmployeeRepository, ItineraryRepository, WorkOrderRepository},
    models::work_order::{
        cancel_note, closing_note, render_notes, CompletionDenied, EventKind, NewEvent, WorkOrder,
        WorkOrderAction, WorkOrderDetail, WorkOrderFilter, WorkOrderListItem,
    },
    services::complaint_sync::ComplaintSync,
};

/// Traduz uma guarda que falhou (UPDATE com zero linhas) no erro semântico.
/// `current` é a OT relida dentro da mesma transação.
pub fn guard_failure(
    id: i32,
    current: Option<&WorkOrder>,
    action: WorkOrderAction,
    operator_id: Option<i32>,
) -> AppError {
    let Some(ot) = current else {
        return AppError::not_found("orden_trabajo", id);
    };

    // OT com operário não volta ao pool nem troca de dono, seja qual for o estado
    if matches!(action, WorkOrderAction::Claim | WorkOrderAction::PullFromPool)
        && ot.assigned_operator_id.is_some()
    {
        return AppError::AlreadyClaimed(id);
    }

    if ot.status.apply(action).is_none() {
        return AppError::InvalidState { id, status: ot.status, action: action.name() };
    }

    match action {
        // Livre e no estado certo, mas fora do pool da cuadrilla pedida
        WorkOrderAction::Claim => AppError::not_found("itinerario_det", id),
        WorkOrderAction::Start if ot.assigned_operator_id != operator_id => {
            AppError::Forbidden(format!("OT {} não está atribuída ao empregado {:?}", id, operator_id))
        }
        _ => AppError::InvalidState { id, status: ot.status, action: action.name() },
    }
}

#[derive(Clone)]
pub struct WorkOrderService {
    repo: WorkOrderRepository,
    complaint_repo: ComplaintRepository,
    employee_repo: EmployeeRepository,
    itinerary_repo: ItineraryRepository,
    sync: ComplaintSync,
}

impl WorkOrderService {
    pub fn new(
        repo: WorkOrderRepository,
        employee_repo: EmployeeRepository,
        itinerary_repo: ItineraryRepository,
        complaint_repo: ComplaintRepository,
    ) -> Self {
        Self {
            repo,
            sync: ComplaintSync::new(complaint_repo.clone()),
            complaint_repo,
            employee_repo,
            itinerary_repo,
        }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &WorkOrderFilter,
    ) -> Result<(Vec<WorkOrderListItem>, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, filter).await
    }

    pub async fn get_detail<'e, E>(&self, executor: E, id: i32) -> Result<WorkOrderDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let work_order = self
            .repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or(AppError::not_found("orden_trabajo", id))?;

        let complaint = self
            .complaint_repo
            .find_by_id(&mut *conn, work_order.complaint_id)
            .await?
            .ok_or(AppError::not_found("reclamo", work_order.complaint_id))?;

        let assigned_operator_name = match work_order.assigned_operator_id {
            Some(op) => self.employee_repo.find_by_id(&mut *conn, op).await?.map(|e| e.full_name()),
            None => None,
        };

        let itinerary = self.repo.find_placement(&mut *conn, id).await?;
        let events = self.repo.list_events(&mut *conn, id).await?;
        let observaciones = render_notes(&events);

        Ok(WorkOrderDetail {
            work_order,
            assigned_operator_name,
            complaint,
            itinerary,
            events,
            observaciones,
        })
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    /// Cria a OT de um reclamo em PENDIENTE. Com operário, já atribui na mesma transação.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        complaint_id: i32,
        operator_id: Option<i32>,
        intervention_address: Option<&str>,
        notes: Option<&str>,
        actor_id: i32,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut work_order = self
            .create_in(&mut *tx, complaint_id, intervention_address, notes, Some(actor_id))
            .await?;

        if let Some(op) = operator_id {
            work_order = self.assign_in(&mut *tx, work_order.id, op, actor_id).await?;
        }

        tx.commit().await?;
        Ok(work_order)
    }

    /// Parte transacional da criação; também usada no registro do reclamo.
    pub(crate) async fn create_in(
        &self,
        conn: &mut PgConnection,
        complaint_id: i32,
        intervention_address: Option<&str>,
        notes: Option<&str>,
        actor_id: Option<i32>,
    ) -> Result<WorkOrder, AppError> {
        let work_order = self
            .repo
            .insert(
                &mut *conn,
                complaint_id,
                intervention_address.map(str::trim).filter(|a| !a.is_empty()),
            )
            .await?;

        let text = notes.map(str::trim).unwrap_or_default();
        self.repo
            .append_event(&mut *conn, work_order.id, &NewEvent::new(actor_id, EventKind::Created, text))
            .await?;

        tracing::info!(ot_id = work_order.id, reclamo_id = complaint_id, "OT criada");
        Ok(work_order)
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    pub async fn assign_direct<'e, E>(
        &self,
        executor: E,
        id: i32,
        operator_id: i32,
        actor_id: i32,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let work_order = self.assign_in(&mut *tx, id, operator_id, actor_id).await?;
        tx.commit().await?;
        Ok(work_order)
    }

    async fn assign_in(
        &self,
        conn: &mut PgConnection,
        id: i32,
        operator_id: i32,
        actor_id: i32,
    ) -> Result<WorkOrder, AppError> {
        let action = WorkOrderAction::AssignDirect;

        let operator = self
            .employee_repo
            .find_active(&mut *conn, operator_id)
            .await?
            .ok_or(AppError::InvalidOperator(operator_id))?;

        let now = Utc::now();
        let Some(work_order) = self.repo.assign(&mut *conn, id, operator_id, now).await? else {
            let current = self.repo.find_by_id(&mut *conn, id).await?;
            return Err(guard_failure(id, current.as_ref(), action, Some(operator_id)));
        };

        self.repo
            .append_event(
                &mut *conn,
                id,
                &NewEvent::new(Some(actor_id), EventKind::Assigned, format!("Asignada a: {}", operator.full_name())),
            )
            .await?;
        self.sync.follow(conn, &work_order, action, None, now).await?;

        tracing::info!(ot_id = id, empleado_id = operator_id, actor_id, estado = %work_order.status, "OT atribuída");
        Ok(work_order)
    }

    pub async fn start<'e, E>(&self, executor: E, id: i32, operator_id: i32) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Start;
        let mut tx = executor.begin().await?;

        let Some(work_order) = self.repo.start(&mut *tx, id, operator_id).await? else {
            let current = self.repo.find_by_id(&mut *tx, id).await?;
            return Err(guard_failure(id, current.as_ref(), action, Some(operator_id)));
        };

        self.repo
            .append_event(&mut *tx, id, &NewEvent::new(Some(operator_id), EventKind::Started, ""))
            .await?;

        tx.commit().await?;
        tracing::info!(ot_id = id, empleado_id = operator_id, estado = %work_order.status, "OT iniciada");
        Ok(work_order)
    }

    /// Fecha a OT. Quem pode fechar depende da origem (ver `CompletionContext::authorize`).
    pub async fn complete<'e, E>(
        &self,
        executor: E,
        id: i32,
        closer_id: i32,
        notes: &str,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Complete;
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(AppError::MissingField("observaciones"));
        }

        let mut tx = executor.begin().await?;

        let ctx = self
            .repo
            .completion_context(&mut *tx, id, closer_id)
            .await?
            .ok_or(AppError::not_found("orden_trabajo", id))?;

        if ctx.status.apply(action).is_none() {
            return Err(AppError::InvalidState { id, status: ctx.status, action: action.name() });
        }

        ctx.authorize(closer_id).map_err(|denied| {
            let reason = match denied {
                CompletionDenied::NotSameCrew => format!(
                    "empregado {} não está na cuadrilla de quem tomou a OT {} (cuadrilla do itinerário: {:?})",
                    closer_id, id, ctx.itinerary_crew_id
                ),
                CompletionDenied::NotAssignee => {
                    format!("OT {} só pode ser fechada pelo empregado {:?}", id, ctx.assigned_operator_id)
                }
            };
            AppError::Forbidden(reason)
        })?;

        let closer = self
            .employee_repo
            .find_active(&mut *tx, closer_id)
            .await?
            .ok_or(AppError::InvalidOperator(closer_id))?;

        let now = Utc::now();
        let Some(work_order) = self.repo.complete(&mut *tx, id, now).await? else {
            let current = self.repo.find_by_id(&mut *tx, id).await?;
            return Err(guard_failure(id, current.as_ref(), action, Some(closer_id)));
        };

        let text = closing_note(notes, ctx.assigned_operator_name.as_deref(), &closer.full_name(), now);
        self.repo
            .append_event(&mut *tx, id, &NewEvent::new(Some(closer_id), EventKind::Completed, text))
            .await?;
        self.sync.follow(&mut *tx, &work_order, action, Some(notes), now).await?;

        tx.commit().await?;
        tracing::info!(
            ot_id = id,
            cerrada_por = closer_id,
            tomada_por = ?ctx.assigned_operator_id,
            itinerario = ctx.is_itinerary,
            "OT completada"
        );
        Ok(work_order)
    }

    pub async fn cancel<'e, E>(
        &self,
        executor: E,
        id: i32,
        reason: &str,
        actor_id: i32,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Cancel;
        if reason.trim().is_empty() {
            return Err(AppError::MissingField("motivo"));
        }

        let mut tx = executor.begin().await?;

        let Some(work_order) = self.repo.cancel(&mut *tx, id).await? else {
            let current = self.repo.find_by_id(&mut *tx, id).await?;
            return Err(guard_failure(id, current.as_ref(), action, None));
        };

        self.repo
            .append_event(&mut *tx, id, &NewEvent::new(Some(actor_id), EventKind::Cancelled, cancel_note(reason)))
            .await?;
        self.sync.follow(&mut *tx, &work_order, action, None, Utc::now()).await?;

        tx.commit().await?;
        tracing::info!(ot_id = id, actor_id, "OT cancelada; reclamo reaberto");
        Ok(work_order)
    }

    /// CANCELADA -> PENDIENTE. A entrada de itinerário que sobrou do cancelamento sai aqui.
    pub async fn reopen<'e, E>(&self, executor: E, id: i32, actor_id: i32) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Reopen;
        let mut tx = executor.begin().await?;

        let Some(work_order) = self.repo.reopen(&mut *tx, id).await? else {
            let current = self.repo.find_by_id(&mut *tx, id).await?;
            return Err(guard_failure(id, current.as_ref(), action, None));
        };

        if let Some(entry) = self.itinerary_repo.find_entry_by_work_order(&mut *tx, id).await? {
            self.itinerary_repo.remove_entry(&mut *tx, &entry).await?;
        }

        self.repo
            .append_event(&mut *tx, id, &NewEvent::new(Some(actor_id), EventKind::Reopened, ""))
            .await?;

        tx.commit().await?;
        tracing::info!(ot_id = id, actor_id, "OT reaberta");
        Ok(work_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::work_order::WorkOrderStatus;

    fn ot(status: WorkOrderStatus, operator: Option<i32>) -> WorkOrder {
        let now = Utc::now();
        WorkOrder {
            id: 42,
            complaint_id: 10,
            assigned_operator_id: operator,
            status,
            scheduled_date: None,
            closed_at: None,
            intervention_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_order_is_not_found() {
        let err = guard_failure(42, None, WorkOrderAction::Start, Some(7));
        assert!(matches!(err, AppError::NotFound { entity: "orden_trabajo", id: 42 }));
    }

    #[test]
    fn wrong_status_is_invalid_state() {
        let current = ot(WorkOrderStatus::Completed, Some(7));
        let err = guard_failure(42, Some(&current), WorkOrderAction::Cancel, None);
        assert!(matches!(err, AppError::InvalidState { status: WorkOrderStatus::Completed, .. }));

        let current = ot(WorkOrderStatus::Assigned, Some(7));
        let err = guard_failure(42, Some(&current), WorkOrderAction::AssignDirect, Some(9));
        assert!(matches!(err, AppError::InvalidState { status: WorkOrderStatus::Assigned, .. }));
    }

    #[test]
    fn losing_claim_is_already_claimed() {
        let current = ot(WorkOrderStatus::Assigned, Some(7));
        assert!(matches!(
            guard_failure(42, Some(&current), WorkOrderAction::Claim, Some(9)),
            AppError::AlreadyClaimed(42)
        ));
        assert!(matches!(
            guard_failure(42, Some(&current), WorkOrderAction::PullFromPool, None),
            AppError::AlreadyClaimed(42)
        ));
    }

    #[test]
    fn held_order_is_already_claimed_even_after_start() {
        for status in [WorkOrderStatus::InProgress, WorkOrderStatus::Completed] {
            let current = ot(status, Some(7));
            assert!(matches!(
                guard_failure(42, Some(&current), WorkOrderAction::PullFromPool, None),
                AppError::AlreadyClaimed(42)
            ));
            assert!(matches!(
                guard_failure(42, Some(&current), WorkOrderAction::Claim, Some(9)),
                AppError::AlreadyClaimed(42)
            ));
        }
    }

    #[test]
    fn cancelled_free_order_is_invalid_state_for_pull() {
        let current = ot(WorkOrderStatus::Cancelled, None);
        assert!(matches!(
            guard_failure(42, Some(&current), WorkOrderAction::PullFromPool, None),
            AppError::InvalidState { status: WorkOrderStatus::Cancelled, .. }
        ));
    }

    #[test]
    fn claim_outside_crew_pool_is_not_found() {
        let current = ot(WorkOrderStatus::Assigned, None);
        assert!(matches!(
            guard_failure(42, Some(&current), WorkOrderAction::Claim, Some(9)),
            AppError::NotFound { entity: "itinerario_det", .. }
        ));
    }

    #[test]
    fn start_by_someone_else_is_forbidden() {
        let current = ot(WorkOrderStatus::Assigned, Some(7));
        assert!(matches!(
            guard_failure(42, Some(&current), WorkOrderAction::Start, Some(9)),
            AppError::Forbidden(_)
        ));
    }
}
