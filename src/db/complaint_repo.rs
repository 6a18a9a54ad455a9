// src/db/complaint_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

use crate::{
    common::error::AppError,
    models::complaint::{Complaint, ComplaintStatus, NewComplaint},
};

#[derive(Clone, Default)]
pub struct ComplaintRepository;

impl ComplaintRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: i32) -> Result<Option<Complaint>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let complaint = sqlx::query_as::<_, Complaint>("SELECT * FROM reclamo WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(complaint)
    }

    pub async fn insert<'e, E>(&self, executor: E, new: &NewComplaint) -> Result<Complaint, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Complaint>(
            r#"
            INSERT INTO reclamo (cuenta_id, tipo_id, prioridad_id, descripcion, estado)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new.account_id)
        .bind(new.type_id)
        .bind(new.priority_id)
        .bind(new.description.trim())
        .bind(ComplaintStatus::Pending)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // A FK violada diz qual cadastro não existe
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_foreign_key_violation() {
                    let constraint = db_err.constraint().unwrap_or_default();
                    if constraint.contains("cuenta") {
                        return AppError::not_found("cuenta", new.account_id);
                    }
                    if constraint.contains("tipo") {
                        return AppError::not_found("tipo_reclamo", new.type_id);
                    }
                    if constraint.contains("prioridad") {
                        return AppError::not_found("prioridad", new.priority_id.unwrap_or_default());
                    }
                }
            }
            e.into()
        })
    }

    // =========================================================================
    //  SINCRONIZAÇÃO OT -> RECLAMO
    // =========================================================================

    /// Move o reclamo para `status`. Ao resolver grava as observações e a data de
    /// fechamento; ao voltar para PENDIENTE limpa as duas.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: i32,
        status: ComplaintStatus,
        closing_notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Complaint, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let closes = matches!(status, ComplaintStatus::Resolved | ComplaintStatus::Closed);

        sqlx::query_as::<_, Complaint>(
            r#"
            UPDATE reclamo
            SET estado = $2,
                observaciones_cierre = CASE WHEN $3 THEN $4 ELSE NULL END,
                fecha_cierre = CASE WHEN $3 THEN $5 ELSE NULL END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(closes)
        .bind(closing_notes)
        .bind(at)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::not_found("reclamo", id))
    }
}
