// src/services/crew_service.rs

use sqlx::{Acquire, Executor, Postgres};

use crate::{
    common::error::AppError,
    db::{CrewRepository, EmployeeRepository},
    models::crew::{Crew, CrewMember},
};

#[derive(Clone)]
pub struct CrewService {
    repo: CrewRepository,
    employee_repo: EmployeeRepository,
}

impl CrewService {
    pub fn new(repo: CrewRepository, employee_repo: EmployeeRepository) -> Self {
        Self { repo, employee_repo }
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<Crew>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor).await
    }

    pub async fn create<'e, E>(&self, executor: E, name: &str, zone: Option<&str>) -> Result<Crew, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let zone = zone.map(str::trim).filter(|z| !z.is_empty());
        let crew = self.repo.create(executor, name.trim(), zone).await?;
        tracing::info!(cuadrilla_id = crew.id, nombre = %crew.name, "Cuadrilla criada");
        Ok(crew)
    }

    pub async fn members<'e, E>(&self, executor: E, crew_id: i32, only_active: bool) -> Result<Vec<CrewMember>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        if self.repo.find_by_id(&mut *conn, crew_id).await?.is_none() {
            return Err(AppError::not_found("cuadrilla", crew_id));
        }

        self.repo.list_members(&mut *conn, crew_id, only_active).await
    }

    /// Coloca o empregado na cuadrilla. A associação ativa anterior (se houver) é encerrada
    /// na mesma transação: cada empregado tem no máximo uma cuadrilla ativa.
    pub async fn add_member<'e, E>(&self, executor: E, crew_id: i32, employee_id: i32) -> Result<CrewMember, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let crew = self
            .repo
            .find_by_id(&mut *tx, crew_id)
            .await?
            .ok_or(AppError::not_found("cuadrilla", crew_id))?;

        if self.employee_repo.find_active(&mut *tx, employee_id).await?.is_none() {
            return Err(AppError::InvalidOperator(employee_id));
        }

        let previous = self.repo.deactivate_membership(&mut *tx, employee_id).await?;
        let member = self.repo.insert_membership(&mut *tx, employee_id, crew.id).await?;

        tx.commit().await?;
        tracing::info!(
            cuadrilla_id = crew.id,
            empleado_id = employee_id,
            associacoes_encerradas = previous,
            "Membro adicionado à cuadrilla"
        );
        Ok(member)
    }

    /// Encerra a associação ativa do empregado com esta cuadrilla.
    pub async fn remove_member<'e, E>(&self, executor: E, crew_id: i32, employee_id: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        if !self.repo.is_active_member(&mut *tx, employee_id, crew_id).await? {
            return Err(AppError::not_found("empleado_cuadrilla", employee_id));
        }

        self.repo.deactivate_membership(&mut *tx, employee_id).await?;

        tx.commit().await?;
        tracing::info!(cuadrilla_id = crew_id, empleado_id = employee_id, "Membro removido da cuadrilla");
        Ok(())
    }
}
