use std::sync::Arc;

use curio_core::config::{AppConfig, ConfigError, LoadOptions};
use curio_core::ports::Catalog;
use curio_core::{
    BatchSettings, BrokerClient, BrokerError, CachedCatalog, RecommendationService,
    ServiceDependencies, SystemClock,
};
use curio_db::{
    connect_with_config, migrations, DbPool, SqlActivityStore, SqlCatalog, SqlRecommendationStore,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub broker: Arc<BrokerClient>,
    pub service: Arc<RecommendationService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("broker connection failed: {0}")]
    Broker(#[source] BrokerError),
}

#[allow(dead_code)]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let broker = Arc::new(BrokerClient::new(&config.broker));
    broker.connect().map_err(BootstrapError::Broker)?;

    let catalog: Arc<dyn Catalog> = Arc::new(CachedCatalog::new(
        Arc::new(SqlCatalog::new(db_pool.clone())),
        config.cache.product_ttl(),
    ));
    let service = RecommendationService::new(
        ServiceDependencies {
            catalog,
            activities: Arc::new(SqlActivityStore::new(db_pool.clone())),
            recommendations: Arc::new(SqlRecommendationStore::new(db_pool.clone())),
            publisher: broker.clone(),
            clock: Arc::new(SystemClock),
        },
        config.recommendations.clone(),
    )
    .with_batch_settings(BatchSettings::from(&config.scheduler));

    Ok(Application { config, db_pool, broker, service: Arc::new(service) })
}
