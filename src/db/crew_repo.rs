// src/db/crew_repo.rs

use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::crew::{Crew, CrewMember},
};

#[derive(Clone, Default)]
pub struct CrewRepository;

impl CrewRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<Crew>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let crews = sqlx::query_as::<_, Crew>("SELECT * FROM cuadrilla ORDER BY nombre ASC")
            .fetch_all(executor)
            .await?;
        Ok(crews)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Crew>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let crew = sqlx::query_as::<_, Crew>("SELECT * FROM cuadrilla WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(crew)
    }

    pub async fn create<'e, E>(&self, executor: E, name: &str, zone: Option<&str>) -> Result<Crew, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let crew = sqlx::query_as::<_, Crew>(
            "INSERT INTO cuadrilla (nombre, zona) VALUES ($1, $2) RETURNING *",
        )
        .bind(name.trim())
        .bind(zone)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::CrewNameTaken(name.trim().to_string());
                }
            }
            e.into()
        })?;
        Ok(crew)
    }

    /// Cuadrilla da associação ativa do empregado.
    pub async fn active_crew_of<'e, E>(&self, executor: E, employee_id: i32) -> Result<Option<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let crew_id = sqlx::query_scalar::<_, i32>(
            "SELECT cuadrilla_id FROM empleado_cuadrilla WHERE empleado_id = $1 AND activo",
        )
        .bind(employee_id)
        .fetch_optional(executor)
        .await?;
        Ok(crew_id)
    }

    pub async fn is_active_member<'e, E>(&self, executor: E, employee_id: i32, crew_id: i32) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let is_member = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM empleado_cuadrilla
                WHERE empleado_id = $1 AND cuadrilla_id = $2 AND activo
            )
            "#,
        )
        .bind(employee_id)
        .bind(crew_id)
        .fetch_one(executor)
        .await?;
        Ok(is_member)
    }

    pub async fn list_members<'e, E>(&self, executor: E, crew_id: i32, only_active: bool) -> Result<Vec<CrewMember>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let members = sqlx::query_as::<_, CrewMember>(
            r#"
            SELECT
                ec.id AS membership_id,
                ec.empleado_id AS employee_id,
                ec.cuadrilla_id AS crew_id,
                e.nombre || ' ' || e.apellido AS full_name,
                ec.activo AS active,
                ec.fecha_alta AS joined_at,
                ec.fecha_baja AS left_at
            FROM empleado_cuadrilla ec
            JOIN empleado e ON e.id = ec.empleado_id
            WHERE ec.cuadrilla_id = $1 AND (ec.activo OR NOT $2)
            ORDER BY ec.activo DESC, e.apellido, e.nombre
            "#,
        )
        .bind(crew_id)
        .bind(only_active)
        .fetch_all(executor)
        .await?;
        Ok(members)
    }

    /// Encerra a associação ativa do empregado (em qualquer cuadrilla).
    pub async fn deactivate_membership<'e, E>(&self, executor: E, employee_id: i32) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE empleado_cuadrilla
            SET activo = FALSE, fecha_baja = NOW()
            WHERE empleado_id = $1 AND activo
            "#,
        )
        .bind(employee_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_membership<'e, E>(&self, executor: E, employee_id: i32, crew_id: i32) -> Result<CrewMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, CrewMember>(
            r#"
            WITH inserted AS (
                INSERT INTO empleado_cuadrilla (empleado_id, cuadrilla_id, activo)
                VALUES ($1, $2, TRUE)
                RETURNING *
            )
            SELECT
                i.id AS membership_id,
                i.empleado_id AS employee_id,
                i.cuadrilla_id AS crew_id,
                e.nombre || ' ' || e.apellido AS full_name,
                i.activo AS active,
                i.fecha_alta AS joined_at,
                i.fecha_baja AS left_at
            FROM inserted i
            JOIN empleado e ON e.id = i.empleado_id
            "#,
        )
        .bind(employee_id)
        .bind(crew_id)
        .fetch_one(executor)
        .await?;
        Ok(member)
    }
}
