mod common;

use common::{complaint, crew_with, days_ahead, employee, entries_for, test_app};
use ot_backend::{
    common::error::AppError,
    models::{complaint::ComplaintStatus, work_order::WorkOrderStatus},
};

#[tokio::test]
#[ignore] // Requires running Postgres
async fn pool_insertion_is_idempotent_and_gapless() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let crew = crew_with(&state, &pool, &[]).await;
    let date = days_ahead(3);

    let first = complaint(&state, &pool, "Primero", "Media", supervisor).await.work_order.id;
    let second = complaint(&state, &pool, "Segundo", "Media", supervisor).await.work_order.id;
    let third = complaint(&state, &pool, "Tercero", "Media", supervisor).await.work_order.id;

    let ot = svc.assign_to_crew(&pool, first, crew, date, supervisor).await.unwrap();
    assert_eq!(ot.status, WorkOrderStatus::Assigned);
    assert_eq!(ot.assigned_operator_id, None);
    assert_eq!(ot.scheduled_date.map(|d| d.date_naive()), Some(date));

    // Repetir no mesmo itinerário não cria outra entrada
    let again = svc.assign_to_crew(&pool, first, crew, date, supervisor).await.unwrap();
    assert_eq!(again.id, first);
    assert_eq!(entries_for(&pool, first).await, 1);

    svc.assign_to_crew(&pool, second, crew, date, supervisor).await.unwrap();
    svc.assign_to_crew(&pool, third, crew, date, supervisor).await.unwrap();

    let orders: Vec<i32> = svc
        .list_pool(&pool, crew, Some(date))
        .await
        .unwrap()
        .iter()
        .map(|e| e.order)
        .collect();
    assert_eq!(orders, [1, 2, 3]);

    // Retirar do meio puxa as posições seguintes
    svc.pull_from_pool(&pool, second, supervisor).await.unwrap();
    let pool_now = svc.list_pool(&pool, crew, Some(date)).await.unwrap();
    let positions: Vec<(i32, i32)> = pool_now.iter().map(|e| (e.work_order_id, e.order)).collect();
    assert_eq!(positions, [(first, 1), (third, 2)]);

    // Outra data = outro itinerário; a OT já está num pool, então não está mais PENDIENTE
    let err = svc.assign_to_crew(&pool, first, crew, days_ahead(4), supervisor).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState { status: WorkOrderStatus::Assigned, .. }), "{err:?}");

    let err = svc.assign_to_crew(&pool, third, i32::MAX, date, supervisor).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "cuadrilla", .. }), "{err:?}");
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn concurrent_claims_have_exactly_one_winner() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let a = employee(&pool, "Ana").await;
    let b = employee(&pool, "Beto").await;
    let crew = crew_with(&state, &pool, &[a, b]).await;

    for _ in 0..5 {
        let id = complaint(&state, &pool, "Carrera", "Alta", supervisor).await.work_order.id;
        svc.assign_to_crew(&pool, id, crew, days_ahead(1), supervisor).await.unwrap();

        let (ra, rb) = tokio::join!(
            svc.claim(&pool, id, a, Some(crew)),
            svc.claim(&pool, id, b, Some(crew)),
        );

        let winner = match (&ra, &rb) {
            (Ok(_), Err(AppError::AlreadyClaimed(_))) => a,
            (Err(AppError::AlreadyClaimed(_)), Ok(_)) => b,
            other => panic!("esperava exatamente um vencedor: {other:?}"),
        };

        let detail = state.work_order_service.get_detail(&pool, id).await.unwrap();
        assert_eq!(detail.work_order.assigned_operator_id, Some(winner));
        assert_eq!(detail.work_order.status, WorkOrderStatus::Assigned);
        assert_eq!(detail.complaint.status, ComplaintStatus::InProgress);
        assert!(detail.observaciones.contains("Tomada por: "));
        // A entrada continua no itinerário depois da tomada
        assert_eq!(entries_for(&pool, id).await, 1);
    }
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn claim_is_limited_to_the_crew_pool() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let op7 = employee(&pool, "Siete").await;
    let op9 = employee(&pool, "Nueve").await;
    let crew3 = crew_with(&state, &pool, &[op7]).await;
    crew_with(&state, &pool, &[op9]).await;

    let id = complaint(&state, &pool, "OT 42", "Alta", supervisor).await.work_order.id;
    svc.assign_to_crew(&pool, id, crew3, days_ahead(2), supervisor).await.unwrap();

    // Operário de outra cuadrilla pedindo o pool da cuadrilla 3
    let err = svc.claim(&pool, id, op9, Some(crew3)).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    // No próprio pool ele não encontra a OT
    let err = svc.claim(&pool, id, op9, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "itinerario_det", .. }), "{err:?}");

    // Sem cuadrilla informada vale a cuadrilla ativa de quem toma
    let ot = svc.claim(&pool, id, op7, None).await.unwrap();
    assert_eq!(ot.assigned_operator_id, Some(op7));

    // Atribuída direto nunca esteve em pool nenhum
    let direct = complaint(&state, &pool, "Directa", "Media", supervisor).await.work_order.id;
    state.work_order_service.assign_direct(&pool, direct, op9, supervisor).await.unwrap();
    let err = svc.claim(&pool, direct, op7, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "itinerario_det", .. }), "{err:?}");
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn pooled_order_closes_by_any_member_of_the_claimers_crew() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let work_orders = &state.work_order_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let a = employee(&pool, "Ana").await;
    let b = employee(&pool, "Beto").await;
    let c = employee(&pool, "Carla").await;
    let crew_x = crew_with(&state, &pool, &[a, b]).await;
    crew_with(&state, &pool, &[c]).await;

    let id = complaint(&state, &pool, "Pool", "Media", supervisor).await.work_order.id;
    svc.assign_to_crew(&pool, id, crew_x, days_ahead(1), supervisor).await.unwrap();
    svc.claim(&pool, id, a, Some(crew_x)).await.unwrap();

    // Só quem tomou inicia
    let err = work_orders.start(&pool, id, b).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");
    work_orders.start(&pool, id, a).await.unwrap();

    let err = work_orders.complete(&pool, id, c, "hecho").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let ot = work_orders.complete(&pool, id, b, "hecho").await.unwrap();
    assert_eq!(ot.status, WorkOrderStatus::Completed);

    let detail = work_orders.get_detail(&pool, id).await.unwrap();
    assert!(
        detail.observaciones.contains("Tomada por: Ana Test / Cerrada por: Beto Test"),
        "{}",
        detail.observaciones
    );
    assert_eq!(detail.complaint.status, ComplaintStatus::Resolved);
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn closing_rights_follow_the_claimers_current_crew() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let work_orders = &state.work_order_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let a = employee(&pool, "Ana").await;
    let b = employee(&pool, "Beto").await;
    let crew = crew_with(&state, &pool, &[a, b]).await;

    let id = complaint(&state, &pool, "Membresía", "Baja", supervisor).await.work_order.id;
    svc.assign_to_crew(&pool, id, crew, days_ahead(1), supervisor).await.unwrap();
    svc.claim(&pool, id, a, None).await.unwrap();
    work_orders.start(&pool, id, a).await.unwrap();

    state.crew_service.remove_member(&pool, crew, b).await.unwrap();
    let err = work_orders.complete(&pool, id, b, "hecho").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    // Mudar de cuadrilla encerra a associação anterior
    let other = crew_with(&state, &pool, &[]).await;
    state.crew_service.add_member(&pool, other, a).await.unwrap();
    let members = state.crew_service.members(&pool, crew, true).await.unwrap();
    assert!(members.iter().all(|m| m.employee_id != a));

    // Vale a cuadrilla atual de quem tomou, não a do itinerário
    state.crew_service.add_member(&pool, other, b).await.unwrap();
    let ot = work_orders.complete(&pool, id, b, "hecho").await.unwrap();
    assert_eq!(ot.status, WorkOrderStatus::Completed);
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn pull_is_refused_once_claimed() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let a = employee(&pool, "Ana").await;
    let b = employee(&pool, "Beto").await;
    let crew = crew_with(&state, &pool, &[a, b]).await;

    let claimed = complaint(&state, &pool, "Tomada", "Alta", supervisor).await.work_order.id;
    svc.assign_to_crew(&pool, claimed, crew, days_ahead(1), supervisor).await.unwrap();
    svc.claim(&pool, claimed, a, Some(crew)).await.unwrap();

    let err = svc.pull_from_pool(&pool, claimed, supervisor).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyClaimed(_)), "{err:?}");
    assert_eq!(entries_for(&pool, claimed).await, 1);

    // Depois de iniciada continua sendo de quem tomou
    state.work_order_service.start(&pool, claimed, a).await.unwrap();
    let err = svc.pull_from_pool(&pool, claimed, supervisor).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyClaimed(_)), "{err:?}");
    let err = svc.claim(&pool, claimed, b, Some(crew)).await.unwrap_err();
    assert!(matches!(err, AppError::AlreadyClaimed(_)), "{err:?}");
    assert_eq!(entries_for(&pool, claimed).await, 1);

    let free = complaint(&state, &pool, "Libre", "Alta", supervisor).await.work_order.id;
    svc.assign_to_crew(&pool, free, crew, days_ahead(1), supervisor).await.unwrap();
    let ot = svc.pull_from_pool(&pool, free, supervisor).await.unwrap();
    assert_eq!(ot.status, WorkOrderStatus::Pending);
    assert_eq!(ot.scheduled_date, None);
    assert_eq!(entries_for(&pool, free).await, 0);

    let err = svc.pull_from_pool(&pool, free, supervisor).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "itinerario_det", .. }), "{err:?}");
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn pool_listing_and_day_summary() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let a = employee(&pool, "Ana").await;
    let crew = crew_with(&state, &pool, &[a]).await;
    let day1 = days_ahead(5);
    let day2 = days_ahead(6);

    let mut ids = Vec::new();
    for (description, priority, date) in [
        ("baja primero", "Baja", day1),
        ("alta segundo", "Alta", day1),
        ("media tercero", "Media", day1),
        ("alta cuarto", "Alta", day1),
        ("otro dia", "Media", day2),
    ] {
        let id = complaint(&state, &pool, description, priority, supervisor).await.work_order.id;
        svc.assign_to_crew(&pool, id, crew, date, supervisor).await.unwrap();
        ids.push(id);
    }
    svc.claim(&pool, ids[0], a, Some(crew)).await.unwrap();

    let entries = svc.list_pool(&pool, crew, None).await.unwrap();
    let listed: Vec<_> = entries.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(listed, ["baja primero", "alta segundo", "media tercero", "alta cuarto", "otro dia"]);
    assert_eq!(entries[0].assigned_operator_name.as_deref(), Some("Ana Test"));
    assert_eq!(entries[0].address.as_deref(), Some("Calle 1"));

    let days = svc.dates_with_pool(&pool, crew, Some(a)).await.unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0].date, day1);
    assert_eq!(days[0].total, 4);
    assert_eq!(days[0].unclaimed, 3);
    assert_eq!(days[0].claimed_by_operator, Some(1));
    assert_eq!(days[0].summary, ["alta segundo", "alta cuarto", "media tercero"]);
    assert_eq!(days[1].total, 1);

    // Canceladas saem do pool
    state.work_order_service.cancel(&pool, ids[4], "sin acceso", supervisor).await.unwrap();
    let days = svc.dates_with_pool(&pool, crew, None).await.unwrap();
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].claimed_by_operator, None);
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn cancel_keeps_the_entry_and_reopen_drops_it() {
    let (pool, state) = test_app().await;
    let svc = &state.itinerary_service;
    let work_orders = &state.work_order_service;
    let supervisor = employee(&pool, "Supervisor").await;
    let crew = crew_with(&state, &pool, &[]).await;

    let id = complaint(&state, &pool, "Reabrir", "Media", supervisor).await.work_order.id;
    svc.assign_to_crew(&pool, id, crew, days_ahead(2), supervisor).await.unwrap();

    work_orders.cancel(&pool, id, "cliente ausente", supervisor).await.unwrap();
    assert_eq!(entries_for(&pool, id).await, 1);
    assert!(svc.list_pool(&pool, crew, None).await.unwrap().is_empty());

    let ot = work_orders.reopen(&pool, id, supervisor).await.unwrap();
    assert_eq!(ot.status, WorkOrderStatus::Pending);
    assert_eq!(ot.assigned_operator_id, None);
    assert_eq!(entries_for(&pool, id).await, 0);

    // De volta a PENDIENTE, pode entrar de novo num pool
    svc.assign_to_crew(&pool, id, crew, days_ahead(2), supervisor).await.unwrap();
    assert_eq!(entries_for(&pool, id).await, 1);
}

#[tokio::test]
#[ignore] // Requires running Postgres
async fn crew_names_are_unique() {
    let (pool, state) = test_app().await;
    let crews = &state.crew_service;
    let name = format!("Cuadrilla {}", uuid::Uuid::new_v4().simple());

    let crew = crews.create(&pool, &format!("  {name} "), Some(" ")).await.unwrap();
    assert_eq!(crew.name, name);
    assert_eq!(crew.zone, None);

    let err = crews.create(&pool, &name, None).await.unwrap_err();
    assert!(matches!(err, AppError::CrewNameTaken(_)), "{err:?}");

    let err = crews.members(&pool, i32::MAX, true).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "cuadrilla", .. }), "{err:?}");
}
