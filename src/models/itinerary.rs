// src/models/itinerary.rs

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::work_order::WorkOrderStatus;

/// Quantas descrições entram no resumo de cada dia.
pub const DAY_SUMMARY_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Itinerary {
    pub id: i32,
    #[sqlx(rename = "cuadrilla_id")]
    pub crew_id: i32,
    #[sqlx(rename = "fecha")]
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ItineraryEntry {
    pub id: i32,
    #[sqlx(rename = "itinerario_id")]
    pub itinerary_id: i32,
    #[sqlx(rename = "ot_id")]
    pub work_order_id: i32,
    #[sqlx(rename = "orden")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
}

/// Linha do pool: itinerário → entrada → OT → reclamo → conta → sócio.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PoolEntry {
    pub itinerary_id: i32,
    pub date: NaiveDate,
    pub crew_id: i32,
    pub entry_id: i32,
    pub order: i32,
    pub work_order_id: i32,
    pub status: WorkOrderStatus,
    pub assigned_operator_id: Option<i32>,
    pub assigned_operator_name: Option<String>,
    pub complaint_id: i32,
    pub description: String,
    pub priority: Option<String>,
    pub account_number: String,
    pub member_name: String,
    pub address: Option<String>,
}

impl PoolEntry {
    pub fn is_claimed(&self) -> bool {
        self.assigned_operator_id.is_some()
    }
}

/// Estados que ainda aparecem no pool.
pub const POOL_STATUSES: &[WorkOrderStatus] = &[
    WorkOrderStatus::Pending,
    WorkOrderStatus::Assigned,
    WorkOrderStatus::InProgress,
];

/// Alta=1, Media=2, Baja=3, qualquer outra coisa=4.
pub fn priority_rank(priority: Option<&str>) -> u8 {
    match priority.map(|p| p.trim().to_lowercase()).as_deref() {
        Some("alta") => 1,
        Some("media") => 2,
        Some("baja") => 3,
        _ => 4,
    }
}

/// Ordena por data, posição no itinerário, livres antes das tomadas e prioridade.
pub fn sort_pool(entries: &mut [PoolEntry]) {
    entries.sort_by_key(|e| {
        (e.date, e.order, e.is_claimed(), priority_rank(e.priority.as_deref()), e.work_order_id)
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PoolDay {
    pub date: NaiveDate,
    pub total: i64,
    pub unclaimed: i64,
    /// Quantas o operário informado já tomou (ausente se nenhum operário foi informado).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by_operator: Option<i64>,
    pub summary: Vec<String>,
}

/// Agrega as entradas do pool por data.
pub fn summarize_days(entries: &[PoolEntry], operator_id: Option<i32>) -> Vec<PoolDay> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&PoolEntry>> = BTreeMap::new();
    for entry in entries {
        by_date.entry(entry.date).or_default().push(entry);
    }

    by_date
        .into_iter()
        .map(|(date, mut day)| {
            let total = day.len() as i64;
            let unclaimed = day.iter().filter(|e| !e.is_claimed()).count() as i64;
            let claimed_by_operator = operator_id.map(|op| {
                day.iter().filter(|e| e.assigned_operator_id == Some(op)).count() as i64
            });

            day.sort_by_key(|e| (priority_rank(e.priority.as_deref()), e.order));
            let summary = day
                .iter()
                .take(DAY_SUMMARY_LEN)
                .map(|e| e.description.clone())
                .collect();

            PoolDay { date, total, unclaimed, claimed_by_operator, summary }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: (i32, u32, u32), order: i32, operator: Option<i32>, priority: &str, description: &str) -> PoolEntry {
        PoolEntry {
            itinerary_id: 1,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            crew_id: 3,
            entry_id: order,
            order,
            work_order_id: 100 + order,
            status: WorkOrderStatus::Assigned,
            assigned_operator_id: operator,
            assigned_operator_name: None,
            complaint_id: 10 + order,
            description: description.to_string(),
            priority: Some(priority.to_string()),
            account_number: "A-1".into(),
            member_name: "Marta Ruiz".into(),
            address: None,
        }
    }

    #[test]
    fn ranks_priorities() {
        assert_eq!(priority_rank(Some("Alta")), 1);
        assert_eq!(priority_rank(Some("MEDIA")), 2);
        assert_eq!(priority_rank(Some(" baja ")), 3);
        assert_eq!(priority_rank(Some("Urgente")), 4);
        assert_eq!(priority_rank(None), 4);
    }

    #[test]
    fn pool_sorted_by_date_then_order() {
        let mut entries = vec![
            entry((2025, 6, 2), 1, None, "Alta", "c"),
            entry((2025, 6, 1), 2, None, "Alta", "b"),
            entry((2025, 6, 1), 1, Some(7), "Baja", "a"),
        ];
        sort_pool(&mut entries);
        let descriptions: Vec<_> = entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, ["a", "b", "c"]);
    }

    #[test]
    fn unclaimed_before_claimed_on_same_position() {
        // Duas entradas com a mesma posição só acontecem em datas iguais de itinerários distintos
        let mut entries = vec![
            entry((2025, 6, 1), 1, Some(7), "Alta", "tomada"),
            entry((2025, 6, 1), 1, None, "Baja", "livre"),
        ];
        sort_pool(&mut entries);
        assert_eq!(entries[0].description, "livre");
    }

    #[test]
    fn day_summary_counts_and_orders_by_priority() {
        let entries = vec![
            entry((2025, 6, 1), 1, Some(7), "Baja", "poste inclinado"),
            entry((2025, 6, 1), 2, None, "Alta", "cable cortado"),
            entry((2025, 6, 1), 3, Some(9), "Media", "medidor"),
            entry((2025, 6, 1), 4, None, "Alta", "transformador"),
            entry((2025, 6, 3), 1, None, "Media", "farol"),
        ];

        let days = summarize_days(&entries, Some(7));
        assert_eq!(days.len(), 2);

        let first = &days[0];
        assert_eq!(first.total, 4);
        assert_eq!(first.unclaimed, 2);
        assert_eq!(first.claimed_by_operator, Some(1));
        assert_eq!(first.summary, ["cable cortado", "transformador", "medidor"]);

        assert_eq!(days[1].total, 1);
        assert_eq!(days[1].claimed_by_operator, Some(0));
    }

    #[test]
    fn day_summary_without_operator() {
        let entries = vec![entry((2025, 6, 1), 1, Some(7), "Alta", "x")];
        let days = summarize_days(&entries, None);
        assert_eq!(days[0].claimed_by_operator, None);
        assert_eq!(days[0].unclaimed, 0);
    }
}
