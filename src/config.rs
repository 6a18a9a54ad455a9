// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};

use crate::{
    common::i18n::I18nStore,
    db::{ComplaintRepository, CrewRepository, EmployeeRepository, ItineraryRepository, WorkOrderRepository},
    services::{AuthService, ComplaintService, CrewService, ItineraryService, WorkOrderService},
};

/// Configuração lida do ambiente (e do `.env`, se houver).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub db_statement_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            db_statement_timeout_ms: parse_var("DB_STATEMENT_TIMEOUT_MS", 5000)?,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

/// Abre o pool. O `statement_timeout` vai como opção da conexão.
pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let options: PgConnectOptions = config
        .database_url
        .parse()
        .context("DATABASE_URL inválida")?;
    let options = options.options([("statement_timeout", config.db_statement_timeout_ms.to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(config.db_acquire_timeout)
        .connect_with(options)
        .await
        .context("falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub work_order_service: WorkOrderService,
    pub itinerary_service: ItineraryService,
    pub crew_service: CrewService,
    pub complaint_service: ComplaintService,
}

impl AppState {
    /// Monta o gráfico de dependências sobre um pool já aberto.
    pub fn new(db_pool: PgPool, jwt_secret: String) -> anyhow::Result<Self> {
        let i18n_store = Arc::new(I18nStore::load()?);

        let work_order_repo = WorkOrderRepository::new();
        let complaint_repo = ComplaintRepository::new();
        let itinerary_repo = ItineraryRepository::new();
        let crew_repo = CrewRepository::new();
        let employee_repo = EmployeeRepository::new();

        let auth_service = AuthService::new(employee_repo.clone(), jwt_secret, db_pool.clone());
        let work_order_service = WorkOrderService::new(
            work_order_repo.clone(),
            employee_repo.clone(),
            itinerary_repo.clone(),
            complaint_repo.clone(),
        );
        let itinerary_service = ItineraryService::new(
            itinerary_repo,
            work_order_repo,
            crew_repo.clone(),
            employee_repo.clone(),
            complaint_repo.clone(),
        );
        let crew_service = CrewService::new(crew_repo, employee_repo);
        let complaint_service = ComplaintService::new(complaint_repo, work_order_service.clone());

        Ok(Self {
            db_pool,
            i18n_store,
            auth_service,
            work_order_service,
            itinerary_service,
            crew_service,
            complaint_service,
        })
    }
}
