// src/db/itinerary_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::itinerary::{Itinerary, ItineraryEntry, PoolEntry, POOL_STATUSES},
};

#[derive(Clone, Default)]
pub struct ItineraryRepository;

impl ItineraryRepository {
    pub fn new() -> Self {
        Self
    }

    /// Busca ou cria o itinerário (cuadrilla, data).
    ///
    /// O `DO UPDATE` sem efeito serve para o RETURNING devolver a linha existente e
    /// para segurar o lock dela até o fim da transação: inserções concorrentes no
    /// mesmo itinerário ficam em fila e o `MAX(orden) + 1` continua sem buracos.
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        crew_id: i32,
        date: NaiveDate,
    ) -> Result<Itinerary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let itinerary = sqlx::query_as::<_, Itinerary>(
            r#"
            INSERT INTO itinerario (cuadrilla_id, fecha)
            VALUES ($1, $2)
            ON CONFLICT (cuadrilla_id, fecha)
            DO UPDATE SET cuadrilla_id = EXCLUDED.cuadrilla_id
            RETURNING *
            "#,
        )
        .bind(crew_id)
        .bind(date)
        .fetch_one(executor)
        .await?;
        Ok(itinerary)
    }

    pub async fn find_entry_by_work_order<'e, E>(
        &self,
        executor: E,
        work_order_id: i32,
    ) -> Result<Option<ItineraryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, ItineraryEntry>("SELECT * FROM itinerario_det WHERE ot_id = $1")
            .bind(work_order_id)
            .fetch_optional(executor)
            .await?;
        Ok(entry)
    }

    pub async fn is_in_crew_pool<'e, E>(&self, executor: E, work_order_id: i32, crew_id: i32) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM itinerario_det d
                JOIN itinerario i ON i.id = d.itinerario_id
                WHERE d.ot_id = $1 AND i.cuadrilla_id = $2
            )
            "#,
        )
        .bind(work_order_id)
        .bind(crew_id)
        .fetch_one(executor)
        .await?;
        Ok(found)
    }

    pub async fn append_entry<'e, E>(
        &self,
        executor: E,
        itinerary_id: i32,
        work_order_id: i32,
    ) -> Result<ItineraryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, ItineraryEntry>(
            r#"
            INSERT INTO itinerario_det (itinerario_id, ot_id, orden)
            SELECT $1, $2, COALESCE(MAX(orden), 0) + 1
            FROM itinerario_det
            WHERE itinerario_id = $1
            RETURNING *
            "#,
        )
        .bind(itinerary_id)
        .bind(work_order_id)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    /// Remove a entrada e puxa as posições seguintes para manter a sequência 1..n.
    pub async fn remove_entry<'e, E>(&self, executor: E, entry: &ItineraryEntry) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            WITH removed AS (
                DELETE FROM itinerario_det WHERE id = $1 RETURNING itinerario_id, orden
            )
            UPDATE itinerario_det d
            SET orden = d.orden - 1
            FROM removed
            WHERE d.itinerario_id = removed.itinerario_id AND d.orden > removed.orden
            "#,
        )
        .bind(entry.id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Linhas do pool de uma cuadrilla. Sem data: todos os dias de hoje em diante.
    /// Só reclamos técnicos e OTs ainda em aberto. A ordenação fica com `sort_pool`.
    pub async fn list_pool<'e, E>(
        &self,
        executor: E,
        crew_id: i32,
        date: Option<NaiveDate>,
    ) -> Result<Vec<PoolEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PoolEntry>(
            r#"
            SELECT
                i.id AS itinerary_id,
                i.fecha AS date,
                i.cuadrilla_id AS crew_id,
                d.id AS entry_id,
                d.orden AS "order",
                ot.id AS work_order_id,
                ot.estado AS status,
                ot.empleado_id AS assigned_operator_id,
                e.nombre || ' ' || e.apellido AS assigned_operator_name,
                r.id AS complaint_id,
                r.descripcion AS description,
                p.nombre AS priority,
                c.numero_cuenta AS account_number,
                s.nombre || ' ' || s.apellido AS member_name,
                COALESCE(ot.direccion_intervencion, c.direccion) AS address
            FROM itinerario i
            JOIN itinerario_det d ON d.itinerario_id = i.id
            JOIN orden_trabajo ot ON ot.id = d.ot_id
            JOIN reclamo r ON r.id = ot.reclamo_id
            JOIN tipo_reclamo t ON t.id = r.tipo_id
            JOIN cuenta c ON c.id = r.cuenta_id
            JOIN socio s ON s.id = c.socio_id
            LEFT JOIN prioridad p ON p.id = r.prioridad_id
            LEFT JOIN empleado e ON e.id = ot.empleado_id
            WHERE i.cuadrilla_id = $1
              AND t.es_tecnico
              AND ot.estado = ANY($2)
              AND (($3::date IS NULL AND i.fecha >= CURRENT_DATE) OR i.fecha = $3::date)
            "#,
        )
        .bind(crew_id)
        .bind(POOL_STATUSES)
        .bind(date)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }
}
