//! Shared bootstrap for commands that touch the database or the service.

use std::future::Future;
use std::sync::Arc;

use curio_core::config::{AppConfig, LoadOptions};
use curio_core::ports::Catalog;
use curio_core::{
    ApplicationError, BatchSettings, BrokerClient, CachedCatalog, RecommendationService,
    ServiceDependencies, SystemClock,
};
use curio_db::migrations;
use curio_db::{
    connect_with_config, DbPool, SqlActivityStore, SqlCatalog, SqlRecommendationStore,
};
use uuid::Uuid;

#[derive(Debug)]
pub(crate) struct Failure {
    pub class: &'static str,
    pub message: String,
    pub exit_code: u8,
    pub correlation_id: Option<String>,
}

impl Failure {
    pub fn new(class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { class, message: message.into(), exit_code, correlation_id: None }
    }

    /// Failures raised by the recommendation service get a correlation id so
    /// they can be matched against server logs.
    pub fn application(error: ApplicationError) -> Self {
        let class = error.class();
        let exit_code = match class {
            "invalid_input" => 6,
            "not_found" => 7,
            "no_recommendations" => 8,
            "configuration" => 2,
            _ => 9,
        };
        let interface = error.into_interface(Uuid::new_v4().to_string());
        Self {
            class,
            message: format!("{} {interface}", interface.user_message()),
            exit_code,
            correlation_id: Some(interface.correlation_id().to_string()),
        }
    }
}

/// Load configuration, start a current-thread runtime and drive `task` on it.
pub(crate) fn execute<T, F, Fut>(task: F) -> Result<T, Failure>
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
{
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        Failure::new("config_validation", format!("configuration issue: {error}"), 2)
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| Failure::new("runtime_init", format!("failed to initialize async runtime: {error}"), 3),
    )?;

    runtime.block_on(task(config))
}

pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| Failure::new("db_connectivity", error.to_string(), 4))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| Failure::new("migration", error.to_string(), 5))?;
    Ok(pool)
}

pub(crate) struct Workspace {
    pub pool: DbPool,
    pub broker: Arc<BrokerClient>,
    pub service: Arc<RecommendationService>,
}

impl Workspace {
    pub async fn open(config: &AppConfig) -> Result<Self, Failure> {
        let pool = open_database(config).await?;

        let broker = Arc::new(BrokerClient::new(&config.broker));
        broker.connect().map_err(|error| Failure::new("broker", error.to_string(), 4))?;

        let catalog: Arc<dyn Catalog> = Arc::new(CachedCatalog::new(
            Arc::new(SqlCatalog::new(pool.clone())),
            config.cache.product_ttl(),
        ));
        let service = RecommendationService::new(
            ServiceDependencies {
                catalog,
                activities: Arc::new(SqlActivityStore::new(pool.clone())),
                recommendations: Arc::new(SqlRecommendationStore::new(pool.clone())),
                publisher: broker.clone(),
                clock: Arc::new(SystemClock),
            },
            config.recommendations.clone(),
        )
        .with_batch_settings(BatchSettings::from(&config.scheduler));

        Ok(Self { pool, broker, service: Arc::new(service) })
    }

    pub async fn close(self) {
        self.broker.close();
        self.pool.close().await;
    }
}
