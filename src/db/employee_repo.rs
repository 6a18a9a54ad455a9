// src/db/employee_repo.rs

use sqlx::{Executor, Postgres};

use crate::{common::error::AppError, models::crew::Employee};

// Cadastro de empregados é externo; aqui só a leitura que OT e auth precisam.
#[derive(Clone, Default)]
pub struct EmployeeRepository;

impl EmployeeRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>("SELECT id, nombre, apellido, activo FROM empleado WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    pub async fn find_active<'e, E>(&self, executor: E, id: i32) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT id, nombre, apellido, activo FROM empleado WHERE id = $1 AND activo",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(employee)
    }
}
