// src/db/work_order_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    models::work_order::{
        CompletionContext, ItineraryPlacement, NewEvent, WorkOrder, WorkOrderAction,
        WorkOrderEvent, WorkOrderFilter, WorkOrderListItem, WorkOrderStatus,
    },
};

// Todas as transições seguem o mesmo formato:
//   UPDATE orden_trabajo SET ... WHERE id = $1 AND estado = ANY(<origens da ação>) [AND ...]
//   RETURNING *
// Zero linhas = a guarda falhou (estado mudou, outro operário ganhou a corrida...).
// Quem decide o erro semântico é o serviço; aqui devolvemos `None`.

#[derive(Clone, Default)]
pub struct WorkOrderRepository;

impl WorkOrderRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ot = sqlx::query_as::<_, WorkOrder>("SELECT * FROM orden_trabajo WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(ot)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        filter: &WorkOrderFilter,
    ) -> Result<(Vec<WorkOrderListItem>, i64), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                ot.*,
                r.descripcion AS complaint_description,
                r.estado AS complaint_status,
                p.nombre AS priority,
                e.nombre || ' ' || e.apellido AS assigned_operator_name,
                i.cuadrilla_id AS crew_id,
                i.fecha AS itinerary_date,
                COUNT(*) OVER () AS total_count
            FROM orden_trabajo ot
            JOIN reclamo r ON r.id = ot.reclamo_id
            LEFT JOIN prioridad p ON p.id = r.prioridad_id
            LEFT JOIN empleado e ON e.id = ot.empleado_id
            LEFT JOIN itinerario_det d ON d.ot_id = ot.id
            LEFT JOIN itinerario i ON i.id = d.itinerario_id
            WHERE TRUE
            "#,
        );

        if let Some(status) = filter.estado {
            qb.push(" AND ot.estado = ").push_bind(status);
        }
        if let Some(operator_id) = filter.empleado_id {
            qb.push(" AND ot.empleado_id = ").push_bind(operator_id);
        }
        if let Some(crew_id) = filter.cuadrilla_id {
            // Da cuadrilla = está no itinerário dela, ou o operário atribuído é membro ativo
            qb.push(" AND (i.cuadrilla_id = ")
                .push_bind(crew_id)
                .push(
                    " OR EXISTS (SELECT 1 FROM empleado_cuadrilla ec \
                     WHERE ec.empleado_id = ot.empleado_id AND ec.activo AND ec.cuadrilla_id = ",
                )
                .push_bind(crew_id)
                .push("))");
        }

        qb.push(" ORDER BY ot.created_at DESC, ot.id DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows = qb
            .build_query_as::<WorkOrderListItem>()
            .fetch_all(executor)
            .await?;

        let total = rows.first().map(|r| r.total_count).unwrap_or(0);
        Ok((rows, total))
    }

    pub async fn find_placement<'e, E>(
        &self,
        executor: E,
        id: i32,
    ) -> Result<Option<ItineraryPlacement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let placement = sqlx::query_as::<_, ItineraryPlacement>(
            r#"
            SELECT
                i.id AS itinerary_id,
                d.id AS entry_id,
                i.cuadrilla_id AS crew_id,
                c.nombre AS crew_name,
                i.fecha AS date,
                d.orden AS "order"
            FROM itinerario_det d
            JOIN itinerario i ON i.id = d.itinerario_id
            JOIN cuadrilla c ON c.id = i.cuadrilla_id
            WHERE d.ot_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(placement)
    }

    /// Tudo o que a regra de fechamento precisa, numa consulta só.
    pub async fn completion_context<'e, E>(
        &self,
        executor: E,
        id: i32,
        closer_id: i32,
    ) -> Result<Option<CompletionContext>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ctx = sqlx::query_as::<_, CompletionContext>(
            r#"
            SELECT
                ot.estado,
                ot.empleado_id,
                e.nombre || ' ' || e.apellido AS assigned_operator_name,
                EXISTS (SELECT 1 FROM itinerario_det d WHERE d.ot_id = ot.id) AS is_itinerary,
                (SELECT i.cuadrilla_id
                   FROM itinerario_det d JOIN itinerario i ON i.id = d.itinerario_id
                  WHERE d.ot_id = ot.id) AS itinerary_crew_id,
                (SELECT ec.cuadrilla_id FROM empleado_cuadrilla ec
                  WHERE ec.empleado_id = ot.empleado_id AND ec.activo) AS assigned_crew_id,
                (SELECT ec.cuadrilla_id FROM empleado_cuadrilla ec
                  WHERE ec.empleado_id = $2 AND ec.activo) AS closer_crew_id
            FROM orden_trabajo ot
            LEFT JOIN empleado e ON e.id = ot.empleado_id
            WHERE ot.id = $1
            "#,
        )
        .bind(id)
        .bind(closer_id)
        .fetch_optional(executor)
        .await?;
        Ok(ctx)
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        complaint_id: i32,
        intervention_address: Option<&str>,
    ) -> Result<WorkOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, WorkOrder>(
            r#"
            INSERT INTO orden_trabajo (reclamo_id, estado, direccion_intervencion)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(complaint_id)
        .bind(WorkOrderStatus::Pending)
        .bind(intervention_address)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::WorkOrderAlreadyExists(complaint_id);
                }
                if db_err.is_foreign_key_violation() {
                    return AppError::not_found("reclamo", complaint_id);
                }
            }
            e.into()
        })
    }

    /// Atribuição direta: grava o operário e carimba a data de atribuição.
    pub async fn assign<'e, E>(
        &self,
        executor: E,
        id: i32,
        operator_id: i32,
        at: DateTime<Utc>,
    ) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::AssignDirect;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET empleado_id = $2, estado = $3, fecha_programada = $4, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(operator_id)
        .bind(action.target())
        .bind(at)
        .bind(action.sources())
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    /// Entrada no pool: ASIGNADA sem operário, com a data do itinerário.
    pub async fn move_to_pool<'e, E>(
        &self,
        executor: E,
        id: i32,
        scheduled: DateTime<Utc>,
    ) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::AssignToCrew;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET estado = $2, fecha_programada = $3, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($4) AND empleado_id IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target())
        .bind(scheduled)
        .bind(action.sources())
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    /// A tomada exatamente-uma-vez. O `empleado_id IS NULL` no WHERE é a trava:
    /// com duas transações concorrentes, a segunda espera o lock de linha da primeira,
    /// reavalia o predicado e sai com zero linhas.
    pub async fn claim<'e, E>(
        &self,
        executor: E,
        id: i32,
        operator_id: i32,
        crew_id: i32,
    ) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Claim;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo ot
            SET empleado_id = $2, estado = $3, updated_at = NOW()
            WHERE ot.id = $1
              AND ot.empleado_id IS NULL
              AND ot.estado = ANY($4)
              AND EXISTS (
                  SELECT 1
                  FROM itinerario_det d
                  JOIN itinerario i ON i.id = d.itinerario_id
                  WHERE d.ot_id = ot.id AND i.cuadrilla_id = $5
              )
            RETURNING ot.*
            "#,
        )
        .bind(id)
        .bind(operator_id)
        .bind(action.target())
        .bind(action.sources())
        .bind(crew_id)
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    pub async fn start<'e, E>(
        &self,
        executor: E,
        id: i32,
        operator_id: i32,
    ) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Start;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET estado = $2, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($3) AND empleado_id = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target())
        .bind(action.sources())
        .bind(operator_id)
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    pub async fn complete<'e, E>(
        &self,
        executor: E,
        id: i32,
        at: DateTime<Utc>,
    ) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Complete;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET estado = $2, fecha_cierre = $3, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target())
        .bind(at)
        .bind(action.sources())
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    pub async fn cancel<'e, E>(&self, executor: E, id: i32) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Cancel;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET estado = $2, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target())
        .bind(action.sources())
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    /// Volta a OT do pool para PENDIENTE. Só enquanto ninguém a tomou.
    pub async fn release_from_pool<'e, E>(
        &self,
        executor: E,
        id: i32,
    ) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::PullFromPool;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET estado = $2, fecha_programada = NULL, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($3) AND empleado_id IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target())
        .bind(action.sources())
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    pub async fn reopen<'e, E>(&self, executor: E, id: i32) -> Result<Option<WorkOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let action = WorkOrderAction::Reopen;
        let ot = sqlx::query_as::<_, WorkOrder>(
            r#"
            UPDATE orden_trabajo
            SET estado = $2, empleado_id = NULL, fecha_programada = NULL,
                fecha_cierre = NULL, updated_at = NOW()
            WHERE id = $1 AND estado = ANY($3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(action.target())
        .bind(action.sources())
        .fetch_optional(executor)
        .await?;
        Ok(ot)
    }

    // =========================================================================
    //  EVENTOS
    // =========================================================================

    pub async fn append_event<'e, E>(
        &self,
        executor: E,
        work_order_id: i32,
        event: &NewEvent,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO ot_evento (ot_id, actor_id, accion, texto) VALUES ($1, $2, $3, $4)")
            .bind(work_order_id)
            .bind(event.actor_id)
            .bind(event.kind)
            .bind(&event.text)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_events<'e, E>(
        &self,
        executor: E,
        work_order_id: i32,
    ) -> Result<Vec<WorkOrderEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let events = sqlx::query_as::<_, WorkOrderEvent>(
            r#"
            SELECT ev.*, e.nombre || ' ' || e.apellido AS actor_name
            FROM ot_evento ev
            LEFT JOIN empleado e ON e.id = ev.actor_id
            WHERE ev.ot_id = $1
            ORDER BY ev.id ASC
            "#,
        )
        .bind(work_order_id)
        .fetch_all(executor)
        .await?;
        Ok(events)
    }
}
