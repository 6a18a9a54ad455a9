//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ot_backend::{
    config::{self, AppState, Config},
    docs::ApiDoc,
    handlers,
    middleware::{auth::auth_guard, request_id::request_id},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let db_pool = config::connect(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app_state = AppState::new(db_pool, config.jwt_secret.clone())?;

    let work_order_routes = Router::new()
        .route(
            "/",
            get(handlers::work_orders::list_work_orders).post(handlers::work_orders::create_work_order),
        )
        .route("/mis-ots", get(handlers::work_orders::list_my_work_orders))
        .route("/operario/{id}", get(handlers::work_orders::list_operator_work_orders))
        .route("/{id}", get(handlers::work_orders::get_work_order))
        .route("/{id}/asignar", put(handlers::work_orders::assign_work_order))
        .route("/{id}/asignar-cuadrilla", put(handlers::work_orders::assign_work_order_to_crew))
        .route("/{id}/iniciar", put(handlers::work_orders::start_work_order))
        .route("/{id}/completar", put(handlers::work_orders::complete_work_order))
        .route("/{id}/cancelar", put(handlers::work_orders::cancel_work_order))
        .route("/{id}/reabrir", put(handlers::work_orders::reopen_work_order));

    let itinerary_routes = Router::new()
        .route("/cuadrilla/{id}", get(handlers::itineraries::list_crew_pool))
        .route("/cuadrilla/{id}/fechas", get(handlers::itineraries::list_crew_pool_dates))
        .route("/mi-cuadrilla", get(handlers::itineraries::list_my_pool))
        .route("/mi-cuadrilla/fechas", get(handlers::itineraries::list_my_pool_dates))
        .route("/ot/{id}/tomar", put(handlers::itineraries::claim_work_order))
        .route("/ot/{id}", delete(handlers::itineraries::pull_work_order));

    let crew_routes = Router::new()
        .route("/", get(handlers::crews::list_crews).post(handlers::crews::create_crew))
        .route(
            "/{id}/miembros",
            get(handlers::crews::list_members).post(handlers::crews::add_member),
        )
        .route("/{id}/miembros/{empleado_id}", delete(handlers::crews::remove_member));

    // Tudo abaixo de /api, menos o health, exige token
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/reclamos", post(handlers::complaints::register_complaint))
        .nest("/ot-tecnicas", work_order_routes)
        .nest("/itinerarios", itinerary_routes)
        .nest("/cuadrillas", crew_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(request_id))
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
