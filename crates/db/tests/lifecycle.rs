mod support;

use chrono::Duration;

use curio_core::domain::activity::{ActivityType, UserId};
use curio_core::domain::product::ProductId;
use curio_core::domain::recommendation::{RecommendationId, RecommendationReason};
use curio_core::ports::{ActivityStore, RecommendationStore};
use curio_core::recommend::UserPreferences;
use curio_core::ApplicationError;

use support::HarnessBuilder;

fn ids(products: &[curio_core::ScoredProduct]) -> Vec<&str> {
    products.iter().map(|p| p.product_id.0.as_str()).collect()
}

#[tokio::test]
async fn purchase_in_category_drives_similar_purchase_recommendations() {
    let harness = HarnessBuilder::seeded().build();
    harness.record("u-1", "smartphone-x", ActivityType::Purchase, 0).await;

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("u-1"), None)
        .await
        .expect("generate");

    assert_eq!(ids(&set.products), vec!["laptop-pro", "wireless-headphones"]);
    assert!(set.products.iter().all(|p| p.reason == RecommendationReason::SimilarPurchase));
    // base 0.188 + category 0.1 + similarity capped at 0.3
    assert!((set.products[0].score - 0.588).abs() < 1e-9);
    assert!(set.products.iter().all(|p| p.score >= 0.3));
    assert_eq!(set.expires_at, harness.clock_now() + Duration::days(7));
    assert!(!set.sent);
}

#[tokio::test]
async fn busy_category_marks_candidates_trending() {
    let harness = HarnessBuilder::seeded().build();
    for _ in 0..11 {
        harness.record("u-1", "smartphone-x", ActivityType::View, 1).await;
    }

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("u-1"), None)
        .await
        .expect("generate");

    let electronics: Vec<_> = set
        .products
        .iter()
        .filter(|p| ["laptop-pro", "wireless-headphones"].contains(&p.product_id.0.as_str()))
        .collect();
    assert_eq!(electronics.len(), 2);
    assert!(electronics.iter().all(|p| p.reason == RecommendationReason::Trending));
    assert!(electronics.iter().all(|p| (p.score - 1.0).abs() < 1e-9));
}

#[tokio::test]
async fn candidates_below_minimum_score_are_not_persisted() {
    let harness = HarnessBuilder::seeded().build();
    harness.record("u-1", "smartphone-x", ActivityType::Purchase, 0).await;

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("u-1"), None)
        .await
        .expect("generate");
    let stored =
        harness.recommendations.find_by_id(&set.id).await.expect("find").expect("persisted");

    // running-shoes only scores its base quality (0.184) and is cut
    assert!(!ids(&stored.products).contains(&"running-shoes"));
    assert_eq!(stored.products.len(), 2);
}

#[tokio::test]
async fn user_without_history_gets_popular_products() {
    let harness = HarnessBuilder::seeded().build();

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("newcomer"), None)
        .await
        .expect("generate");

    assert_eq!(
        ids(&set.products),
        vec!["laptop-pro", "running-shoes", "kitchen-blender", "smartphone-x", "denim-jeans"]
    );
    assert!(set.products.iter().all(|p| p.reason == RecommendationReason::PopularInCategory));
}

#[tokio::test]
async fn popular_fallback_puts_preferred_categories_first() {
    let harness = HarnessBuilder::seeded().build();
    let preferences = UserPreferences::with_categories(["fitness"]);

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("newcomer"), Some(&preferences))
        .await
        .expect("generate");

    assert_eq!(set.products[0].product_id, ProductId::from("yoga-mat"));
    assert!((set.products[0].score - 1.0).abs() < 1e-9);
    assert_eq!(set.products.len(), 5);
}

#[tokio::test]
async fn empty_catalog_reports_no_recommendations() {
    let harness = HarnessBuilder::empty_catalog().build();

    let result =
        harness.service.generate_user_recommendations(&UserId::from("u-1"), None).await;

    assert!(matches!(result, Err(ApplicationError::NoRecommendationsAvailable { .. })));
    assert!(harness.publisher.published().is_empty());
}

#[tokio::test]
async fn active_unsent_set_is_reused() {
    let harness = HarnessBuilder::seeded().build();
    let user = UserId::from("u-1");
    harness.record("u-1", "denim-jeans", ActivityType::Cart, 2).await;

    let first = harness.service.generate_user_recommendations(&user, None).await.expect("first");
    harness.clock.advance(Duration::hours(6));
    let second =
        harness.service.generate_user_recommendations(&user, None).await.expect("second");

    assert_eq!(first.id, second.id);
    assert_eq!(harness.recommendations.sets_for_user(&user).await.len(), 1);
    assert_eq!(harness.publisher.published().len(), 1);
}

#[tokio::test]
async fn expired_set_is_replaced() {
    let harness = HarnessBuilder::seeded().build();
    let user = UserId::from("u-1");

    let first = harness.service.generate_user_recommendations(&user, None).await.expect("first");
    harness.clock.advance(Duration::days(7));
    let second =
        harness.service.generate_user_recommendations(&user, None).await.expect("second");

    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn concurrent_generation_for_one_user_yields_one_set() {
    let harness = HarnessBuilder::seeded().build();
    harness.record("u-1", "yoga-mat", ActivityType::Purchase, 1).await;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = harness.service.clone();
        tasks.push(tokio::spawn(async move {
            service.generate_user_recommendations(&UserId::from("u-1"), None).await
        }));
    }

    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await.expect("join").expect("generate").id);
    }
    seen.dedup();

    assert_eq!(seen.len(), 1);
    assert_eq!(harness.recommendations.sets_for_user(&UserId::from("u-1")).await.len(), 1);
}

#[tokio::test]
async fn creation_event_follows_persist_and_carries_top_products() {
    let harness = HarnessBuilder::seeded().build();

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("u-9"), None)
        .await
        .expect("generate");

    let published = harness.publisher.published();
    assert_eq!(published.len(), 1);
    let event = &published[0];
    assert_eq!(event.topic, "recommendation.created");
    assert!(event.persisted_before_publish);
    assert_eq!(event.payload["recommendationId"], set.id.0.as_str());
    assert_eq!(event.payload["userId"], "u-9");
    let products = event.payload["products"].as_array().expect("products");
    assert_eq!(products.len(), 3);
    assert_eq!(products[0]["id"], "laptop-pro");
    assert_eq!(products[0]["price"], "1499.99");
    assert_eq!(products[0]["imageUrl"], "https://example.com/laptop-pro.jpg");
}

#[tokio::test]
async fn publish_failure_does_not_fail_generation() {
    let harness = HarnessBuilder::seeded().failing_publisher().build();

    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("u-1"), None)
        .await
        .expect("generate despite publish failure");

    assert!(harness.recommendations.find_by_id(&set.id).await.expect("find").is_some());
    assert_eq!(harness.publisher.published().len(), 1);
}

#[tokio::test]
async fn get_marks_set_as_sent_and_resolves_products() {
    let harness = HarnessBuilder::seeded().build();
    let user = UserId::from("u-1");
    harness.record("u-1", "smartphone-x", ActivityType::Purchase, 0).await;

    let view = harness.service.get_user_recommendations(&user).await.expect("get");

    assert!(view.sent);
    assert_eq!(view.sent_at, Some(harness.clock_now()));
    assert_eq!(view.products[0].product.name, "Laptop Pro");
    let stored = harness.recommendations.find_by_id(&view.id).await.expect("find").expect("set");
    assert!(stored.sent);

    harness.clock.advance(Duration::minutes(30));
    let again = harness.service.get_user_recommendations(&user).await.expect("get again");
    assert_eq!(again.id, view.id);
    assert_eq!(again.sent_at, view.sent_at);
}

#[tokio::test]
async fn generate_after_delivery_builds_a_fresh_set() {
    let harness = HarnessBuilder::seeded().build();
    let user = UserId::from("u-1");

    let delivered = harness.service.get_user_recommendations(&user).await.expect("get");
    let fresh = harness.service.generate_user_recommendations(&user, None).await.expect("gen");

    assert_ne!(delivered.id, fresh.id);
    assert!(!fresh.sent);
}

#[tokio::test]
async fn get_drops_products_removed_from_catalog() {
    let harness = HarnessBuilder::seeded().build();
    let user = UserId::from("u-1");
    harness.record("u-1", "smartphone-x", ActivityType::Purchase, 0).await;
    let set = harness.service.generate_user_recommendations(&user, None).await.expect("generate");

    harness.catalog.remove(&ProductId::from("laptop-pro")).await;
    let view = harness.service.get_user_recommendations(&user).await.expect("get");

    assert_eq!(view.id, set.id);
    assert_eq!(view.products.len(), set.products.len() - 1);
    assert!(view.products.iter().all(|p| p.product.id != ProductId::from("laptop-pro")));
}

#[tokio::test]
async fn mark_sent_twice_keeps_original_timestamp() {
    let harness = HarnessBuilder::seeded().build();
    let set = harness
        .service
        .generate_user_recommendations(&UserId::from("u-1"), None)
        .await
        .expect("generate");

    let first = harness.service.mark_recommendation_as_sent(&set.id).await.expect("mark");
    harness.clock.advance(Duration::hours(2));
    let second = harness.service.mark_recommendation_as_sent(&set.id).await.expect("mark again");

    assert!(second.sent);
    assert_eq!(second.sent_at, first.sent_at);
    assert_eq!(first.sent_at, Some(support::start()));
}

#[tokio::test]
async fn mark_sent_unknown_id_is_not_found() {
    let harness = HarnessBuilder::seeded().build();

    let result =
        harness.service.mark_recommendation_as_sent(&RecommendationId::from("missing")).await;

    assert!(matches!(result, Err(ApplicationError::NotFound { entity: "recommendation", .. })));
}

#[tokio::test]
async fn create_activity_requires_known_product() {
    let harness = HarnessBuilder::seeded().build();
    let user = UserId::from("u-1");

    let missing = harness
        .service
        .create_user_activity(&user, &ProductId::from("ghost"), ActivityType::View, None)
        .await;
    assert!(matches!(missing, Err(ApplicationError::NotFound { entity: "product", .. })));

    let record = harness
        .service
        .create_user_activity(&user, &ProductId::from("yoga-mat"), ActivityType::Wishlist, None)
        .await
        .expect("create");
    assert_eq!(record.timestamp, harness.clock_now());
    assert_eq!(harness.activities.find_by_user(&user, 10).await.expect("find"), vec![record]);
}
