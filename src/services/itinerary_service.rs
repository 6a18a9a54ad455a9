// src/services/itinerary_service.rs

use chrono::{NaiveDate, NaiveTime, Utc};
use sqlx::{Acquire, Executor, Postgres};

use crate::{
    common::error::AppError,
    db::{ComplaintRepository, CrewRepository, EmployeeRepository, ItineraryRepository, WorkOrderRepository},
    models::{
        itinerary::{sort_pool, summarize_days, PoolDay, PoolEntry},
        work_order::{claim_note, EventKind, NewEvent, WorkOrder, WorkOrderAction},
    },
    services::{complaint_sync::ComplaintSync, work_order_service::guard_failure},
};

#[derive(Clone)]
pub struct ItineraryService {
    repo: ItineraryRepository,
    work_order_repo: WorkOrderRepository,
    crew_repo: CrewRepository,
    employee_repo: EmployeeRepository,
    sync: ComplaintSync,
}

impl ItineraryService {
    pub fn new(
        repo: ItineraryRepository,
        work_order_repo: WorkOrderRepository,
        crew_repo: CrewRepository,
        employee_repo: EmployeeRepository,
        complaint_repo: ComplaintRepository,
    ) -> Self {
        Self {
            repo,
            work_order_repo,
            crew_repo,
            employee_repo,
            sync: ComplaintSync::new(complaint_repo),
        }
    }

    /// Cuadrilla ativa do operário; sem ela não há pool para ele.
    pub async fn operator_crew<'e, E>(&self, executor: E, operator_id: i32) -> Result<i32, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.crew_repo
            .active_crew_of(executor, operator_id)
            .await?
            .ok_or(AppError::not_found("empleado_cuadrilla", operator_id))
    }

    // =========================================================================
    //  ENTRADA NO POOL
    // =========================================================================

    /// Põe a OT no itinerário (cuadrilla, data). Repetir para o mesmo itinerário não muda nada.
    pub async fn assign_to_crew<'e, E>(
        &self,
        executor: E,
        id: i32,
        crew_id: i32,
        date: NaiveDate,
        actor_id: i32,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::AssignToCrew;
        let mut tx = executor.begin().await?;

        let crew = self
            .crew_repo
            .find_by_id(&mut *tx, crew_id)
            .await?
            .ok_or(AppError::not_found("cuadrilla", crew_id))?;

        let itinerary = self.repo.upsert(&mut *tx, crew_id, date).await?;

        if let Some(entry) = self.repo.find_entry_by_work_order(&mut *tx, id).await? {
            if entry.itinerary_id == itinerary.id {
                let current = self
                    .work_order_repo
                    .find_by_id(&mut *tx, id)
                    .await?
                    .ok_or(AppError::not_found("orden_trabajo", id))?;
                tx.commit().await?;
                tracing::debug!(ot_id = id, itinerario_id = itinerary.id, "OT já está neste itinerário");
                return Ok(current);
            }
        }

        let scheduled = date.and_time(NaiveTime::MIN).and_utc();
        let Some(work_order) = self.work_order_repo.move_to_pool(&mut *tx, id, scheduled).await? else {
            let current = self.work_order_repo.find_by_id(&mut *tx, id).await?;
            return Err(guard_failure(id, current.as_ref(), action, None));
        };

        let entry = self.repo.append_entry(&mut *tx, itinerary.id, id).await?;

        let text = format!("Itinerario: {} - {}", crew.name, date.format("%d/%m/%Y"));
        self.work_order_repo
            .append_event(&mut *tx, id, &NewEvent::new(Some(actor_id), EventKind::Pooled, text))
            .await?;

        tx.commit().await?;
        tracing::info!(
            ot_id = id,
            cuadrilla_id = crew_id,
            fecha = %date,
            orden = entry.order,
            actor_id,
            "OT colocada no itinerário"
        );
        Ok(work_order)
    }

    // =========================================================================
    //  LEITURA DO POOL
    // =========================================================================

    pub async fn list_pool<'e, E>(
        &self,
        executor: E,
        crew_id: i32,
        date: Option<NaiveDate>,
    ) -> Result<Vec<PoolEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        if self.crew_repo.find_by_id(&mut *conn, crew_id).await?.is_none() {
            return Err(AppError::not_found("cuadrilla", crew_id));
        }

        let mut entries = self.repo.list_pool(&mut *conn, crew_id, date).await?;
        sort_pool(&mut entries);
        Ok(entries)
    }

    /// Dias (de hoje em diante) com trabalho no pool da cuadrilla.
    pub async fn dates_with_pool<'e, E>(
        &self,
        executor: E,
        crew_id: i32,
        operator_id: Option<i32>,
    ) -> Result<Vec<PoolDay>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let entries = self.list_pool(executor, crew_id, None).await?;
        Ok(summarize_days(&entries, operator_id))
    }

    // =========================================================================
    //  TOMADA E RETIRADA
    // =========================================================================

    /// Um membro ativo da cuadrilla toma a OT do pool. Só um pedido concorrente vence.
    pub async fn claim<'e, E>(
        &self,
        executor: E,
        id: i32,
        operator_id: i32,
        crew_id: Option<i32>,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Claim;
        let mut tx = executor.begin().await?;

        let crew_id = match crew_id {
            Some(crew_id) => crew_id,
            None => self.operator_crew(&mut *tx, operator_id).await?,
        };

        if !self.crew_repo.is_active_member(&mut *tx, operator_id, crew_id).await? {
            return Err(AppError::Forbidden(format!(
                "empregado {} não é membro ativo da cuadrilla {}",
                operator_id, crew_id
            )));
        }

        let operator = self
            .employee_repo
            .find_active(&mut *tx, operator_id)
            .await?
            .ok_or(AppError::InvalidOperator(operator_id))?;

        let Some(work_order) = self.work_order_repo.claim(&mut *tx, id, operator_id, crew_id).await? else {
            let current = self.work_order_repo.find_by_id(&mut *tx, id).await?;
            // Fora do pool desta cuadrilla (inclusive atribuída direto): não há o que tomar
            let err = if current.is_some() && !self.repo.is_in_crew_pool(&mut *tx, id, crew_id).await? {
                AppError::not_found("itinerario_det", id)
            } else {
                guard_failure(id, current.as_ref(), action, Some(operator_id))
            };
            if let AppError::AlreadyClaimed(_) = err {
                tracing::warn!(ot_id = id, empleado_id = operator_id, "Tomada perdida: OT já tem operário");
            }
            return Err(err);
        };

        let now = Utc::now();
        self.work_order_repo
            .append_event(
                &mut *tx,
                id,
                &NewEvent::new(Some(operator_id), EventKind::Claimed, claim_note(&operator.full_name(), now)),
            )
            .await?;
        self.sync.follow(&mut *tx, &work_order, action, None, now).await?;

        tx.commit().await?;
        tracing::info!(ot_id = id, empleado_id = operator_id, cuadrilla_id = crew_id, "OT tomada do pool");
        Ok(work_order)
    }

    /// Tira do pool uma OT que ninguém tomou; ela volta para PENDIENTE.
    pub async fn pull_from_pool<'e, E>(&self, executor: E, id: i32, actor_id: i32) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::PullFromPool;
        let mut tx = executor.begin().await?;

        let Some(entry) = self.repo.find_entry_by_work_order(&mut *tx, id).await? else {
            return Err(match self.work_order_repo.find_by_id(&mut *tx, id).await? {
                None => AppError::not_found("orden_trabajo", id),
                Some(_) => AppError::not_found("itinerario_det", id),
            });
        };

        let Some(work_order) = self.work_order_repo.release_from_pool(&mut *tx, id).await? else {
            let current = self.work_order_repo.find_by_id(&mut *tx, id).await?;
            let err = guard_failure(id, current.as_ref(), action, None);
            if let AppError::AlreadyClaimed(_) = err {
                tracing::warn!(ot_id = id, actor_id, "Retirada negada: OT já foi tomada");
            }
            return Err(err);
        };

        self.repo.remove_entry(&mut *tx, &entry).await?;
        self.work_order_repo
            .append_event(&mut *tx, id, &NewEvent::new(Some(actor_id), EventKind::Pulled, ""))
            .await?;

        tx.commit().await?;
        tracing::info!(ot_id = id, itinerario_id = entry.itinerary_id, actor_id, "OT retirada do pool");
        Ok(work_order)
    }
}
