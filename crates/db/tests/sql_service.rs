//! Recommendation lifecycle running against SQLite repositories.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use curio_core::broker::BrokerClient;
use curio_core::config::RecommendationConfig;
use curio_core::domain::activity::{ActivityType, UserId};
use curio_core::domain::product::ProductId;
use curio_core::ports::{Catalog, RecommendationStore};
use curio_core::{FixedClock, RecommendationService, ServiceDependencies};
use curio_db::migrations::run_pending;
use curio_db::{
    connect_with_settings, SeedDataset, SqlActivityStore, SqlCatalog, SqlRecommendationStore,
};

struct SqlHarness {
    catalog: Arc<SqlCatalog>,
    activities: Arc<SqlActivityStore>,
    recommendations: Arc<SqlRecommendationStore>,
    service: Arc<RecommendationService>,
}

async fn harness() -> SqlHarness {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    run_pending(&pool).await.expect("migrations");

    let catalog = Arc::new(SqlCatalog::new(pool.clone()));
    let activities = Arc::new(SqlActivityStore::new(pool.clone()));
    let recommendations = Arc::new(SqlRecommendationStore::new(pool));
    let service = RecommendationService::new(
        ServiceDependencies {
            catalog: catalog.clone(),
            activities: activities.clone(),
            recommendations: recommendations.clone(),
            publisher: Arc::new(BrokerClient::in_process(8)),
            clock: Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap())),
        },
        RecommendationConfig::default(),
    );

    SqlHarness { catalog, activities, recommendations, service: Arc::new(service) }
}

#[tokio::test]
async fn seeded_database_supports_full_lifecycle() {
    let h = harness().await;
    let now = Utc.with_ymd_and_hms(2026, 6, 15, 10, 0, 0).unwrap();
    let seeded =
        SeedDataset::default().load(h.catalog.as_ref(), h.activities.as_ref(), now).await.expect("seed");
    assert_eq!(seeded.products_seeded, 10);
    assert_eq!(h.catalog.count().await.expect("count"), 10);

    let outcome = h.service.generate_batch_recommendations().await.expect("batch");
    assert_eq!(outcome.total, 4);
    assert_eq!(outcome.success + outcome.failed, 4);
}

#[tokio::test]
async fn get_persists_sent_flag_in_sqlite() {
    let h = harness().await;
    for product in SeedDataset::products() {
        h.catalog.save(product).await.expect("save");
    }
    let user = UserId::from("u-1");
    h.service
        .create_user_activity(&user, &ProductId::from("smartphone-x"), ActivityType::Purchase, None)
        .await
        .expect("activity");

    let view = h.service.get_user_recommendations(&user).await.expect("get");

    assert_eq!(view.products[0].product.id, ProductId::from("laptop-pro"));
    let stored = h.recommendations.find_by_id(&view.id).await.expect("find").expect("stored");
    assert!(stored.sent);
    assert_eq!(stored.sent_at, view.sent_at);
    assert_eq!(stored.products.len(), view.products.len());
}
